//! Protocol message helpers for sending/receiving RFB messages.
//!
//! This module provides convenience functions for reading server messages
//! and writing client messages using the buffered RFB streams from
//! `rfb-protocol`.
//!
//! The helpers are intentionally thin wrappers over the low-level
//! `rfb_protocol::messages` types, enforcing the project's fail-fast
//! policy and returning rich `RfbClientError` values.

use crate::errors::RfbClientError;
use crate::protocol_trace;
use rfb_protocol::io::{RfbInStream, RfbOutStream};
use rfb_protocol::messages as msg;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read only the next server message type byte.
pub async fn read_message_type<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<u8, RfbClientError> {
    let t = instream.read_u8().await.map_err(RfbClientError::TransportError)?;
    if protocol_trace::enabled() {
        protocol_trace::in_msg("ServerMessageType", &format!("type={}", t));
    }
    Ok(t)
}

/// Read a `FramebufferUpdate` message header: 1 padding byte followed by the
/// rectangle count (§4.6). Does not touch the framebuffer; callers read and
/// apply each rectangle individually afterward.
pub async fn read_framebuffer_update_header<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> Result<u16, RfbClientError> {
    instream.skip(1).await.map_err(|e| {
        RfbClientError::ProtocolParseError(format!(
            "failed to read FramebufferUpdate padding: {e}"
        ))
    })?;
    instream.read_u16().await.map_err(|e| {
        RfbClientError::ProtocolParseError(format!(
            "failed to read FramebufferUpdate rect count: {e}"
        ))
    })
}

/// Write a ClientInit message (shared/exclusive session) and flush.
pub async fn write_client_init<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    shared: bool,
) -> Result<(), RfbClientError> {
    let msg = msg::ClientInit { shared };
    if protocol_trace::enabled() {
        protocol_trace::out_msg("ClientInit", &format!("shared={}", shared));
    }
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write SetPixelFormat and flush.
pub async fn write_set_pixel_format<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    pixel_format: msg::PixelFormat,
) -> Result<(), RfbClientError> {
    let msg = msg::SetPixelFormat { pixel_format };
    if protocol_trace::enabled() {
        protocol_trace::out_msg(
            "SetPixelFormat",
            &format!(
                "bpp={} depth={} shifts={}/{}/{}",
                msg.pixel_format.bits_per_pixel,
                msg.pixel_format.depth,
                msg.pixel_format.red_shift,
                msg.pixel_format.green_shift,
                msg.pixel_format.blue_shift
            ),
        );
    }
    msg.write_to(outstream)
        .map_err(RfbClientError::TransportError)?;
    tracing::debug!(
        "Wrote SetPixelFormat (bpp={}, depth={}, shifts r/g/b={}/{}/{})",
        msg.pixel_format.bits_per_pixel,
        msg.pixel_format.depth,
        msg.pixel_format.red_shift,
        msg.pixel_format.green_shift,
        msg.pixel_format.blue_shift
    );
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write SetEncodings with preferred encoding order and flush.
pub async fn write_set_encodings<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    encodings: Vec<i32>,
) -> Result<(), RfbClientError> {
    let msg = msg::SetEncodings { encodings };
    if protocol_trace::enabled() {
        protocol_trace::out_msg("SetEncodings", &format!("n={}", msg.encodings.len()));
    }
    tracing::debug!("Wrote SetEncodings: {:?}", msg.encodings);
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write a FramebufferUpdateRequest and flush.
pub async fn write_framebuffer_update_request<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    incremental: bool,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> Result<(), RfbClientError> {
    let msg = msg::FramebufferUpdateRequest {
        incremental,
        x,
        y,
        width,
        height,
    };
    if protocol_trace::enabled() {
        protocol_trace::out_msg(
            "FramebufferUpdateRequest",
            &format!("inc={} rect=({},{} {}x{})", incremental, x, y, width, height),
        );
    }
    tracing::debug!(
        "Wrote FramebufferUpdateRequest inc={} rect=({},{} {}x{})",
        incremental,
        x,
        y,
        width,
        height
    );
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write a KeyEvent (press or release) and flush.
pub async fn write_key_event<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    key: u32,
    down: bool,
) -> Result<(), RfbClientError> {
    let msg = msg::KeyEvent { down, key };
    if protocol_trace::enabled() {
        protocol_trace::out_msg("KeyEvent", &format!("down={} key=0x{:X}", down, key));
    }
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write a PointerEvent (mouse) and flush.
pub async fn write_pointer_event<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    button_mask: u8,
    x: u16,
    y: u16,
) -> Result<(), RfbClientError> {
    let msg = msg::PointerEvent { button_mask, x, y };
    if protocol_trace::enabled() {
        protocol_trace::out_msg(
            "PointerEvent",
            &format!("buttons=0x{:02X} pos=({}, {})", button_mask, x, y),
        );
    }
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}

/// Write ClientCutText and flush.
pub async fn write_client_cut_text<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    text: &str,
) -> Result<(), RfbClientError> {
    let msg = msg::ClientCutText {
        text: text.to_string(),
    };
    if protocol_trace::enabled() {
        protocol_trace::out_msg("ClientCutText", &format!("len={}", msg.text.len()));
    }
    msg.write_to(outstream);
    outstream.flush().await.map_err(RfbClientError::TransportError)
}
