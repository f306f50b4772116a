//! Hextile encoding decoder - Tiled encoding with multiple sub-encodings.
//!
//! Hextile (type 5) is one of the most commonly used VNC encodings. It divides rectangles
//! into 16x16 pixel tiles (with smaller tiles at edges), and each tile can use different
//! sub-encodings for optimal compression. This encoding provides a good balance between
//! bandwidth efficiency and decoding speed.
//!
//! # Wire Format
//!
//! For each 16x16 tile in the rectangle (smaller at edges):
//!
//! ```text
//! +------------------+
//! | tile_type        |  1 byte (bit flags)
//! +------------------+
//! | [raw_pixels]     |  tile_w * tile_h * bpp bytes (if RAW bit set)
//! +------------------+
//! | [background]     |  bpp bytes (if BACKGROUND_SPECIFIED)
//! +------------------+
//! | [foreground]     |  bpp bytes (if FOREGROUND_SPECIFIED)
//! +------------------+
//! | [num_subrects]   |  1 byte (if ANY_SUBRECTS)
//! +------------------+
//! | [subrects...]    |  For each subrect:
//! |   [pixel]        |    bpp bytes (if SUBRECTS_COLOURED)
//! |   xy             |    1 byte: x=(xy>>4), y=(xy&0xF)
//! |   wh             |    1 byte: w=((wh>>4)+1), h=((wh&0xF)+1)
//! +------------------+
//! ```
//!
//! # Tile Type Flags
//!
//! - **RAW (0x01)**: Tile is raw uncompressed pixels (ignores other flags)
//! - **BACKGROUND_SPECIFIED (0x02)**: New background color follows
//! - **FOREGROUND_SPECIFIED (0x04)**: New foreground color follows
//! - **ANY_SUBRECTS (0x08)**: Subrectangles follow after optional colors
//! - **SUBRECTS_COLOURED (0x10)**: Each subrect has its own color (vs using foreground)
//!
//! As with the other encodings, every pixel value (tile background,
//! foreground, subrect colors, and RAW tile pixels alike) travels in the
//! server's wire pixel format and is mapped into the framebuffer's canonical
//! local ARGB representation before it reaches the buffer.
//!
//! # State Persistence
//!
//! Background and foreground colors persist across tiles **within a single rectangle**.
//! The decoder must reset these to `None` at the start of each rectangle decode.
//! This allows efficient encoding of large uniform regions without repeating colors.
//!
//! # Performance
//!
//! Hextile is widely used because it:
//! - Compresses solid regions well (single background fill)
//! - Handles text and UI elements efficiently (foreground + subrects)
//! - Decodes quickly (no decompression algorithms)
//! - Adapts per-tile (can fall back to RAW for complex regions)
//!
//! # Example
//!
//! ```no_run
//! use rfb_encodings::{Decoder, HextileDecoder, ENCODING_HEXTILE};
//!
//! let decoder = HextileDecoder;
//! assert_eq!(decoder.encoding_type(), ENCODING_HEXTILE);
//! ```

use crate::{Decoder, MutablePixelBuffer, PixelFormat, Rectangle, RfbInStream, ENCODING_HEXTILE};
use anyhow::{anyhow, Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

// Hextile tile type flags (bit positions in the tile type byte)
const TILE_RAW: u8 = 1 << 0; // 0x01: Raw tile encoding
const TILE_BACKGROUND_SPECIFIED: u8 = 1 << 1; // 0x02: Background color follows
const TILE_FOREGROUND_SPECIFIED: u8 = 1 << 2; // 0x04: Foreground color follows
const TILE_ANY_SUBRECTS: u8 = 1 << 3; // 0x08: Subrectangles present
const TILE_SUBRECTS_COLOURED: u8 = 1 << 4; // 0x10: Subrects each have a color

/// Standard Hextile tile size (tiles at rectangle edges may be smaller).
const TILE_SIZE: u16 = 16;

/// Decoder for Hextile encoding.
///
/// This encoding divides the rectangle into 16x16 tiles, with each tile using one
/// of several sub-encodings for optimal compression. Tiles can be RAW (uncompressed),
/// background-only, or contain foreground-colored sub-rectangles.
///
/// # Example
///
/// ```no_run
/// # use rfb_encodings::{Decoder, HextileDecoder, ENCODING_HEXTILE};
/// let decoder = HextileDecoder;
/// assert_eq!(decoder.encoding_type(), ENCODING_HEXTILE);
/// ```
pub struct HextileDecoder;

impl Decoder for HextileDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_HEXTILE
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
            "Hextile decode start: rect=[{},{} {}x{}] buffer_before={}",
            rect.x, rect.y, rect.width, rect.height,
            buffer_before
        );

        // Empty rectangle - nothing to decode
        if rect.width == 0 || rect.height == 0 {
            tracing::debug!(
                target: "rfb_encodings::framing",
                "Hextile decode end: empty rectangle, bytes_consumed=0, buffer_after={}",
                stream.available()
            );
            return Ok(());
        }

        let wire_format: rfb_pixelbuffer::PixelFormat = pixel_format.clone().into();
        let bytes_per_pixel = wire_format.bytes_per_pixel();
        if bytes_per_pixel == 0 || bytes_per_pixel > 4 {
            return Err(anyhow!(
                "Invalid bytes_per_pixel: {} (must be 1-4)",
                bytes_per_pixel
            ));
        }

        // Per-rectangle state: background and foreground persist across tiles within one
        // rectangle. Stored already mapped to local ARGB.
        let mut background: Option<[u8; 4]> = None;
        let mut foreground: Option<[u8; 4]> = None;

        // Process tiles in 16x16 blocks, top-to-bottom, left-to-right
        let mut ty = 0u16;
        while ty < rect.height {
            let tile_h = std::cmp::min(TILE_SIZE, rect.height - ty);

            let mut tx = 0u16;
            while tx < rect.width {
                let tile_w = std::cmp::min(TILE_SIZE, rect.width - tx);

                // Read tile type byte
                let tile_type = stream.read_u8().await.with_context(|| {
                    format!(
                        "Failed to read Hextile tile type at tile ({}, {}) in rect at ({}, {})",
                        tx, ty, rect.x, rect.y
                    )
                })?;

                // RAW tile: uncompressed pixel data
                if (tile_type & TILE_RAW) != 0 {
                    let abs_x = rect
                        .x
                        .checked_add(tx)
                        .ok_or_else(|| anyhow!("Hextile RAW tile absolute x overflows"))?;
                    let abs_y = rect
                        .y
                        .checked_add(ty)
                        .ok_or_else(|| anyhow!("Hextile RAW tile absolute y overflows"))?;
                    decode_raw_tile(
                        stream,
                        buffer,
                        &wire_format,
                        (abs_x, abs_y),
                        (tile_w, tile_h),
                        bytes_per_pixel,
                        (tx, ty),
                    )
                    .await?;
                    tx += TILE_SIZE;
                    continue;
                }

                // Non-RAW tile: Handle background, foreground, and subrects

                // Update background color if specified
                if (tile_type & TILE_BACKGROUND_SPECIFIED) != 0 {
                    let mut bg = vec![0u8; bytes_per_pixel as usize];
                    stream.read_bytes(&mut bg).await.with_context(|| {
                        format!(
                            "Failed to read Hextile background at tile ({}, {}) in rect at ({}, {})",
                            tx, ty, rect.x, rect.y
                        )
                    })?;
                    background = Some(wire_format.map_pixel_to_local_bytes(&bg));
                }

                // Background must be defined to fill tile
                let bg = background.ok_or_else(|| {
                    anyhow!(
                        "Hextile tile at ({}, {}) in rect at ({}, {}) requires background but none was specified",
                        tx, ty, rect.x, rect.y
                    )
                })?;

                // Fill tile with background color
                let abs_x = rect
                    .x
                    .checked_add(tx)
                    .ok_or_else(|| anyhow!("Hextile tile absolute x overflows"))?;
                let abs_y = rect
                    .y
                    .checked_add(ty)
                    .ok_or_else(|| anyhow!("Hextile tile absolute y overflows"))?;
                let tile_rect = Rect::new(abs_x as i32, abs_y as i32, tile_w as u32, tile_h as u32);
                buffer.fill_rect(tile_rect, &bg).with_context(|| {
                    format!(
                        "Failed to fill Hextile background at tile ({}, {}) in rect at ({}, {})",
                        tx, ty, rect.x, rect.y
                    )
                })?;

                // Update foreground color if specified
                if (tile_type & TILE_FOREGROUND_SPECIFIED) != 0 {
                    let mut fg = vec![0u8; bytes_per_pixel as usize];
                    stream.read_bytes(&mut fg).await.with_context(|| {
                        format!(
                            "Failed to read Hextile foreground at tile ({}, {}) in rect at ({}, {})",
                            tx, ty, rect.x, rect.y
                        )
                    })?;
                    foreground = Some(wire_format.map_pixel_to_local_bytes(&fg));
                }

                // Decode subrectangles if present
                if (tile_type & TILE_ANY_SUBRECTS) != 0 {
                    let num_subrects = stream.read_u8().await.with_context(|| {
                        format!(
                            "Failed to read Hextile subrect count at tile ({}, {}) in rect at ({}, {})",
                            tx, ty, rect.x, rect.y
                        )
                    })?;

                    let subrects_coloured = (tile_type & TILE_SUBRECTS_COLOURED) != 0;

                    // If subrects are monochrome and count > 0, we need a foreground color
                    if num_subrects > 0 && !subrects_coloured && foreground.is_none() {
                        return Err(anyhow!(
                            "Hextile tile at ({}, {}) in rect at ({}, {}) has monochrome subrects but no foreground color",
                            tx, ty, rect.x, rect.y
                        ));
                    }

                    for i in 0..num_subrects {
                        // Read color if subrects are colored, else use foreground
                        let color = if subrects_coloured {
                            let mut col = vec![0u8; bytes_per_pixel as usize];
                            stream.read_bytes(&mut col).await.with_context(|| {
                                format!(
                                    "Failed to read color for Hextile subrect {} at tile ({}, {}) in rect at ({}, {})",
                                    i, tx, ty, rect.x, rect.y
                                )
                            })?;
                            wire_format.map_pixel_to_local_bytes(&col)
                        } else {
                            foreground.unwrap()
                        };

                        // Read position byte: high nibble = x, low nibble = y
                        let xy = stream.read_u8().await.with_context(|| {
                            format!(
                                "Failed to read XY for Hextile subrect {} at tile ({}, {}) in rect at ({}, {})",
                                i, tx, ty, rect.x, rect.y
                            )
                        })?;
                        let x_off = (xy >> 4) & 0x0F;
                        let y_off = xy & 0x0F;

                        // Read size byte: high nibble = (width-1), low nibble = (height-1)
                        let wh = stream.read_u8().await.with_context(|| {
                            format!(
                                "Failed to read WH for Hextile subrect {} at tile ({}, {}) in rect at ({}, {})",
                                i, tx, ty, rect.x, rect.y
                            )
                        })?;
                        let w = ((wh >> 4) & 0x0F) + 1;
                        let h = (wh & 0x0F) + 1;

                        // Validate subrect is within tile bounds
                        let right = x_off.checked_add(w).ok_or_else(|| {
                            anyhow!(
                                "Hextile subrect {} x+width overflows: {} + {} at tile ({}, {})",
                                i,
                                x_off,
                                w,
                                tx,
                                ty
                            )
                        })?;
                        let bottom = y_off.checked_add(h).ok_or_else(|| {
                            anyhow!(
                                "Hextile subrect {} y+height overflows: {} + {} at tile ({}, {})",
                                i,
                                y_off,
                                h,
                                tx,
                                ty
                            )
                        })?;

                        if right as u16 > tile_w {
                            return Err(anyhow!(
                                "Hextile subrect {} extends beyond tile width: x={}, w={}, tile_w={} at tile ({}, {})",
                                i, x_off, w, tile_w, tx, ty
                            ));
                        }
                        if bottom as u16 > tile_h {
                            return Err(anyhow!(
                                "Hextile subrect {} extends beyond tile height: y={}, h={}, tile_h={} at tile ({}, {})",
                                i, y_off, h, tile_h, tx, ty
                            ));
                        }

                        // Draw subrectangle
                        let sr_abs_x = abs_x
                            .checked_add(x_off as u16)
                            .ok_or_else(|| anyhow!("Hextile subrect absolute x overflows"))?;
                        let sr_abs_y = abs_y
                            .checked_add(y_off as u16)
                            .ok_or_else(|| anyhow!("Hextile subrect absolute y overflows"))?;
                        let subrect =
                            Rect::new(sr_abs_x as i32, sr_abs_y as i32, w as u32, h as u32);
                        buffer.fill_rect(subrect, &color).with_context(|| {
                            format!(
                                "Failed to fill Hextile subrect {} at ({}, {}) size {}x{} in tile ({}, {})",
                                i, x_off, y_off, w, h, tx, ty
                            )
                        })?;
                    }
                }

                tx += TILE_SIZE;
            }
            ty += TILE_SIZE;
        }

        let buffer_after = stream.available();
        tracing::debug!(
            target: "rfb_encodings::framing",
            "Hextile decode end: bytes_consumed={}, buffer_after={}",
            buffer_before.saturating_sub(buffer_after),
            buffer_after
        );

        Ok(())
    }
}

/// Decode a RAW tile: uncompressed pixel data for the entire tile.
async fn decode_raw_tile<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    buffer: &mut dyn MutablePixelBuffer,
    wire_format: &rfb_pixelbuffer::PixelFormat,
    abs_pos: (u16, u16),   // Absolute (x, y) position in framebuffer
    tile_size: (u16, u16), // (width, height) of tile
    bytes_per_pixel: u8,
    tile_offset: (u16, u16), // (tx, ty) for error reporting
) -> Result<()> {
    let (abs_x, abs_y) = abs_pos;
    let (tile_w, tile_h) = tile_size;
    let (tx, ty) = tile_offset;
    // Calculate total bytes to read
    let pixels_per_row = tile_w as usize;
    let row_bytes = pixels_per_row
        .checked_mul(bytes_per_pixel as usize)
        .ok_or_else(|| anyhow!("Hextile RAW tile row bytes overflow"))?;
    let total_bytes = row_bytes
        .checked_mul(tile_h as usize)
        .ok_or_else(|| anyhow!("Hextile RAW tile total bytes overflow"))?;

    // Read all raw wire-format pixel data
    let mut raw_data = vec![0u8; total_bytes];
    stream.read_bytes(&mut raw_data).await.with_context(|| {
        format!(
            "Failed to read {} bytes of RAW data for Hextile tile at ({}, {})",
            total_bytes, tx, ty
        )
    })?;

    // Map every wire pixel to local ARGB before writing.
    let mut local_data = vec![0u8; pixels_per_row * (tile_h as usize) * 4];
    for (i, wire_pixel) in raw_data.chunks_exact(bytes_per_pixel as usize).enumerate() {
        let local_pixel = wire_format.map_pixel_to_local_bytes(wire_pixel);
        local_data[i * 4..i * 4 + 4].copy_from_slice(&local_pixel);
    }
    let local_row_bytes = pixels_per_row * 4;

    // Write row-by-row into the framebuffer (stride may differ from tile width)
    for row in 0..tile_h {
        let src_offset = (row as usize) * local_row_bytes;
        let src_row = &local_data[src_offset..src_offset + local_row_bytes];

        let row_y = abs_y
            .checked_add(row)
            .ok_or_else(|| anyhow!("Hextile RAW tile row y overflows"))?;
        let row_rect = Rect::new(abs_x as i32, row_y as i32, tile_w as u32, 1);

        buffer
            .image_rect(row_rect, src_row, tile_w as usize)
            .with_context(|| {
                format!(
                    "Failed to write RAW tile row {} at ({}, {}) for tile at ({}, {})",
                    row, abs_x, row_y, tx, ty
                )
            })?;
    }

    Ok(())
}
