//! Raw encoding decoder - uncompressed pixel data.
//!
//! Raw encoding (type 0) is the simplest VNC encoding. It transmits pixels as
//! uncompressed data in the server's negotiated pixel format. The decoder reads
//! `width * height * bytes_per_pixel` bytes from the stream, maps every pixel through
//! the server's [`PixelFormat`] into the framebuffer's canonical local ARGB
//! representation, and writes the converted pixels to the pixel buffer.
//!
//! # Wire Format
//!
//! ```text
//! +-------------+
//! | Pixel data  |  width * height * bytes_per_pixel bytes
//! +-------------+
//! ```
//!
//! Each pixel is transmitted in the server's pixel format (as negotiated during
//! the ServerInit handshake or a subsequent SetPixelFormat). No compression is
//! applied on the wire; the conversion to local ARGB happens entirely client-side.
//!
//! # Performance
//!
//! Raw encoding is the least efficient in terms of bandwidth (since no compression
//! is used), but it's the simplest to decode and requires minimal CPU. It's typically
//! used as a fallback when other encodings aren't available or suitable.
//!
//! # Example
//!
//! ```no_run
//! use rfb_encodings::{Decoder, RawDecoder, ENCODING_RAW};
//!
//! let decoder = RawDecoder;
//! assert_eq!(decoder.encoding_type(), ENCODING_RAW);
//! ```

use crate::{Decoder, MutablePixelBuffer, PixelFormat, Rectangle, RfbInStream, ENCODING_RAW};
use anyhow::{Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Decoder for raw (uncompressed) pixel data.
///
/// This is the simplest VNC encoding - pixels are transmitted without any
/// compression or transformation. The decoder reads `width * height * bytes_per_pixel`
/// bytes from the stream, maps each one through the server's pixel format into local
/// ARGB, and writes the result to the buffer.
///
/// # Example
///
/// ```no_run
/// # use rfb_encodings::{Decoder, RawDecoder, ENCODING_RAW};
/// let decoder = RawDecoder;
/// assert_eq!(decoder.encoding_type(), ENCODING_RAW);
/// ```
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_RAW
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> Result<()> {
        let buffer_before = stream.available();
        tracing::debug!(
            target: "rfb_encodings::framing",
            "Raw decode start: rect=[{},{} {}x{}] buffer_before={}",
            rect.x, rect.y, rect.width, rect.height,
            buffer_before
        );

        let width = rect.width as usize;
        let height = rect.height as usize;

        if width == 0 || height == 0 {
            tracing::debug!(
                target: "rfb_encodings::framing",
                "Raw decode end: empty rectangle, bytes_consumed=0, buffer_after={}",
                stream.available()
            );
            return Ok(()); // Empty rectangle - nothing to decode
        }

        let wire_format: rfb_pixelbuffer::PixelFormat = pixel_format.clone().into();
        let wire_bpp = wire_format.bytes_per_pixel() as usize;
        let total_bytes = width * height * wire_bpp;

        // Read all wire-format pixel data from the stream
        let mut wire_data = vec![0u8; total_bytes];
        stream
            .read_bytes(&mut wire_data)
            .await
            .context("Failed to read raw pixel data from stream")?;

        // Map every pixel into the framebuffer's canonical local ARGB layout before
        // it ever reaches the buffer. Three specialized inner loops, one per wire
        // bpp, share the same `map_pixel` color-mapping step (§9: "per-pixel branch
        // on bpp; keep three specialized inner loops for Raw").
        let mut local_data = vec![0u8; width * height * 4];
        match wire_bpp {
            1 => {
                for (i, &byte) in wire_data.iter().enumerate() {
                    let raw = u32::from(byte);
                    let local = rfb_pixelbuffer::PixelFormat::pack_local_argb(wire_format.map_pixel(raw));
                    local_data[i * 4..i * 4 + 4].copy_from_slice(&local);
                }
            }
            2 => {
                for (i, chunk) in wire_data.chunks_exact(2).enumerate() {
                    let raw = wire_format.extract_raw(chunk);
                    let local = rfb_pixelbuffer::PixelFormat::pack_local_argb(wire_format.map_pixel(raw));
                    local_data[i * 4..i * 4 + 4].copy_from_slice(&local);
                }
            }
            4 => {
                for (i, chunk) in wire_data.chunks_exact(4).enumerate() {
                    let raw = wire_format.extract_raw(chunk);
                    let local = rfb_pixelbuffer::PixelFormat::pack_local_argb(wire_format.map_pixel(raw));
                    local_data[i * 4..i * 4 + 4].copy_from_slice(&local);
                }
            }
            other => {
                return Err(anyhow::anyhow!("unsupported wire bytes-per-pixel {other}"));
            }
        }

        let dest_rect = Rect::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as u32,
            rect.height as u32,
        );

        // Stride equals width since the converted data is tightly packed.
        buffer
            .image_rect(dest_rect, &local_data, width)
            .context("Failed to write raw pixel data to buffer")?;

        let buffer_after = stream.available();
        tracing::debug!(
            target: "rfb_encodings::framing",
            "Raw decode end: bytes_consumed={}, buffer_after={}",
            buffer_before.saturating_sub(buffer_after),
            buffer_after
        );

        Ok(())
    }
}
