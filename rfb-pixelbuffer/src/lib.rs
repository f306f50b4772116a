//! RFB pixel buffer types and utilities.
//!
//! This crate provides pixel format descriptions and buffer management for the
//! RFB/VNC protocol implementation. The buffer stores pixels in a single
//! canonical 32-bit local ARGB representation; wire-format conversion happens
//! once, at decode time, via [`PixelFormat::map_pixel`].

pub mod buffer;
pub mod format;
pub mod managed;

pub use buffer::{MutablePixelBuffer, PixelBuffer};
pub use format::PixelFormat;
pub use managed::ManagedPixelBuffer;
