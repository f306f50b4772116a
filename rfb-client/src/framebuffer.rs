//! Framebuffer state management and decoder registry.
//!
//! This module manages the client's framebuffer and provides a registry of
//! encoding decoders to apply server framebuffer update rectangles.

use crate::errors::RfbClientError;
use anyhow::Result as AnyResult;
use rfb_common::Rect;
use rfb_encodings as enc;
use rfb_encodings::{Decoder, MutablePixelBuffer, RfbInStream};
use rfb_pixelbuffer::{ManagedPixelBuffer, PixelBuffer as _, PixelFormat as LocalPixelFormat};
use rfb_protocol::messages::types::{PixelFormat as ServerPixelFormat, Rectangle};
use std::collections::HashMap;
use tokio::io::AsyncRead;

/// Registry of decoders keyed by encoding type.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<i32, DecoderEntry>,
}

impl DecoderRegistry {
    /// Create a registry with all standard encodings registered.
    pub fn with_standard() -> Self {
        let mut reg = Self::default();
        reg.register(DecoderEntry::Raw(enc::RawDecoder));
        reg.register(DecoderEntry::CopyRect(enc::CopyRectDecoder));
        reg.register(DecoderEntry::RRE(enc::RREDecoder));
        reg.register(DecoderEntry::CoRRE(enc::CoRREDecoder));
        reg.register(DecoderEntry::Hextile(enc::HextileDecoder));
        reg
    }

    /// Register a decoder entry.
    pub(crate) fn register(&mut self, decoder: DecoderEntry) {
        self.decoders.insert(decoder.encoding_type(), decoder);
    }

    /// Get a decoder by encoding type.
    pub(crate) fn get(&self, encoding: i32) -> Option<&DecoderEntry> {
        self.decoders.get(&encoding)
    }
}

/// A concrete decoder entry wrapper for dynamic dispatch over non-object-safe Decoder.
pub(crate) enum DecoderEntry {
    Raw(enc::RawDecoder),
    CopyRect(enc::CopyRectDecoder),
    RRE(enc::RREDecoder),
    CoRRE(enc::CoRREDecoder),
    Hextile(enc::HextileDecoder),
}

impl DecoderEntry {
    fn encoding_type(&self) -> i32 {
        match self {
            Self::Raw(d) => d.encoding_type(),
            Self::CopyRect(d) => d.encoding_type(),
            Self::RRE(d) => d.encoding_type(),
            Self::CoRRE(d) => d.encoding_type(),
            Self::Hextile(d) => d.encoding_type(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Raw(_) => "Raw",
            Self::CopyRect(_) => "CopyRect",
            Self::RRE(_) => "RRE",
            Self::CoRRE(_) => "CoRRE",
            Self::Hextile(_) => "Hextile",
        }
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &ServerPixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> AnyResult<()> {
        match self {
            Self::Raw(d) => d.decode(stream, rect, pixel_format, buffer).await,
            Self::CopyRect(d) => d.decode(stream, rect, pixel_format, buffer).await,
            Self::RRE(d) => d.decode(stream, rect, pixel_format, buffer).await,
            Self::CoRRE(d) => d.decode(stream, rect, pixel_format, buffer).await,
            Self::Hextile(d) => d.decode(stream, rect, pixel_format, buffer).await,
        }
    }
}

/// Framebuffer state and decoder dispatcher.
pub struct Framebuffer {
    /// Local framebuffer buffer in a fixed output pixel format (RGB888).
    buffer: ManagedPixelBuffer,
    /// Server-advertised pixel format (input format for decoders).
    server_pixel_format: ServerPixelFormat,
    /// Decoder registry.
    registry: DecoderRegistry,
}

impl Framebuffer {
    /// Create a new framebuffer with given server pixel format and dimensions.
    ///
    /// The internal buffer uses local RGB888 format for simplicity and broad compatibility.
    pub fn new(width: u16, height: u16, server_pixel_format: ServerPixelFormat) -> Self {
        let local_format = LocalPixelFormat::rgb888();
        let buffer = ManagedPixelBuffer::new(width as u32, height as u32, local_format);
        Self {
            buffer,
            server_pixel_format,
            registry: DecoderRegistry::with_standard(),
        }
    }

    /// Returns the current dimensions.
    pub fn size(&self) -> (u16, u16) {
        let (w, h) = self.buffer.dimensions();
        (w as u16, h as u16)
    }

    /// Returns a reference to the underlying buffer.
    pub fn buffer(&self) -> &ManagedPixelBuffer {
        &self.buffer
    }

    /// Returns a mutable reference to the underlying buffer.
    pub fn buffer_mut(&mut self) -> &mut ManagedPixelBuffer {
        &mut self.buffer
    }

    /// Returns the pixel format rectangles are currently decoded from.
    pub fn server_pixel_format(&self) -> ServerPixelFormat {
        self.server_pixel_format.clone()
    }

    /// Updates the pixel format incoming rectangles are decoded from.
    ///
    /// Called after a pixel-format reconfiguration (§4.2) takes effect; the
    /// locally-stored buffer format is unaffected.
    pub fn set_server_pixel_format(&mut self, server_pixel_format: ServerPixelFormat) {
        self.server_pixel_format = server_pixel_format;
    }

    /// Apply a single rectangle update from the server.
    pub async fn apply_rectangle<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
    ) -> Result<(), RfbClientError> {
        let right = (rect.x as i64) + (rect.width as i64);
        let bottom = (rect.y as i64) + (rect.height as i64);
        let (buf_w, buf_h) = self.buffer.dimensions();
        if right > buf_w as i64 || bottom > buf_h as i64 {
            return Err(RfbClientError::MalformedUpdate(format!(
                "rectangle [{},{} {}x{}] exceeds framebuffer bounds {}x{}",
                rect.x, rect.y, rect.width, rect.height, buf_w, buf_h
            )));
        }

        let decoder = self
            .registry
            .get(rect.encoding)
            .ok_or_else(|| RfbClientError::Unsupported(format!("encoding type {}", rect.encoding)))?;

        tracing::debug!(
            "Decoder selected: {} (encoding={}) for rect x={}, y={}, w={}, h={}",
            decoder.name(),
            rect.encoding,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );

        let pf = &self.server_pixel_format;
        let buffer: &mut dyn MutablePixelBuffer = &mut self.buffer;

        decoder.decode(stream, rect, pf, buffer).await?;
        Ok(())
    }

    /// Returns and clears the pixel buffer's pending damage region (§4.3).
    ///
    /// The caller drains this once per decoded rectangle, under the same lock
    /// acquisition used to decode it, so the frame sink is notified after each
    /// rectangle rather than once per whole update (§4.3, §5).
    pub fn take_damage(&mut self) -> Option<Rect> {
        self.buffer.take_damage()
    }
}
