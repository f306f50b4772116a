//! CoRRE encoding decoder - compact RRE with byte-sized subrectangles.
//!
//! CoRRE (type 4) is RRE with subrectangle coordinates and sizes narrowed to a
//! single byte each, instead of `u16`. This bounds every subrectangle (and by
//! extension the whole update rectangle, since a server using CoRRE must split
//! anything wider or taller than 255 pixels into several rectangles) to an
//! 8-bit coordinate space, which keeps the per-subrect overhead small for
//! screens made mostly of small solid-color regions.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | num_subrects     |  4 bytes (u32, network byte order)
//! +------------------+
//! | background_pixel |  bytes_per_pixel bytes
//! +------------------+
//! | Subrectangle 1   |
//! |   pixel          |  bytes_per_pixel bytes
//! |   x              |  1 byte (u8)
//! |   y              |  1 byte (u8)
//! |   width          |  1 byte (u8)
//! |   height         |  1 byte (u8)
//! +------------------+
//! | Subrectangle N   |
//! |   ...            |
//! +------------------+
//! ```
//!
//! Decoding proceeds exactly as for RRE: fill the whole rectangle with the
//! mapped background color, then overwrite each subrectangle with its mapped
//! color. Every pixel value travels in the server's wire pixel format and is
//! mapped into the framebuffer's local ARGB representation before filling.

use crate::{Decoder, MutablePixelBuffer, PixelFormat, Rectangle, RfbInStream, ENCODING_CORRE};
use anyhow::{anyhow, Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Decoder for CoRRE (compact Rise-and-Run-length Encoding).
pub struct CoRREDecoder;

impl Decoder for CoRREDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_CORRE
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> Result<()> {
        if rect.width == 0 || rect.height == 0 {
            return Ok(());
        }

        let wire_format: rfb_pixelbuffer::PixelFormat = pixel_format.clone().into();
        let bytes_per_pixel = wire_format.bytes_per_pixel() as usize;
        if bytes_per_pixel == 0 || bytes_per_pixel > 4 {
            return Err(anyhow!(
                "Invalid bytes_per_pixel: {} (must be 1-4)",
                bytes_per_pixel
            ));
        }

        let num_subrects = stream
            .read_u32()
            .await
            .context("Failed to read CoRRE num_subrects")?;

        let mut bg_wire = vec![0u8; bytes_per_pixel];
        stream
            .read_bytes(&mut bg_wire)
            .await
            .context("Failed to read CoRRE background pixel")?;
        let bg_local = wire_format.map_pixel_to_local_bytes(&bg_wire);

        let dest_rect = Rect::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as u32,
            rect.height as u32,
        );
        buffer
            .fill_rect(dest_rect, &bg_local)
            .context("Failed to fill background in CoRRE decode")?;

        for i in 0..num_subrects {
            let mut pixel_wire = vec![0u8; bytes_per_pixel];
            stream
                .read_bytes(&mut pixel_wire)
                .await
                .with_context(|| format!("Failed to read pixel for CoRRE subrect {}", i))?;
            let pixel_local = wire_format.map_pixel_to_local_bytes(&pixel_wire);

            let x = stream
                .read_u8()
                .await
                .with_context(|| format!("Failed to read x for CoRRE subrect {}", i))?
                as u16;
            let y = stream
                .read_u8()
                .await
                .with_context(|| format!("Failed to read y for CoRRE subrect {}", i))?
                as u16;
            let width = stream
                .read_u8()
                .await
                .with_context(|| format!("Failed to read width for CoRRE subrect {}", i))?
                as u16;
            let height = stream
                .read_u8()
                .await
                .with_context(|| format!("Failed to read height for CoRRE subrect {}", i))?
                as u16;

            let right = x
                .checked_add(width)
                .ok_or_else(|| anyhow!("CoRRE subrect {} x+width overflows: {} + {}", i, x, width))?;
            let bottom = y.checked_add(height).ok_or_else(|| {
                anyhow!("CoRRE subrect {} y+height overflows: {} + {}", i, y, height)
            })?;

            if right > rect.width {
                return Err(anyhow!(
                    "CoRRE subrect {} extends beyond rectangle width: x={}, width={}, rect.width={}",
                    i,
                    x,
                    width,
                    rect.width
                ));
            }
            if bottom > rect.height {
                return Err(anyhow!(
                    "CoRRE subrect {} extends beyond rectangle height: y={}, height={}, rect.height={}",
                    i,
                    y,
                    height,
                    rect.height
                ));
            }

            if width == 0 || height == 0 {
                continue;
            }

            let abs_x = rect
                .x
                .checked_add(x)
                .ok_or_else(|| anyhow!("CoRRE subrect {} absolute x overflows", i))?;
            let abs_y = rect
                .y
                .checked_add(y)
                .ok_or_else(|| anyhow!("CoRRE subrect {} absolute y overflows", i))?;

            let subrect = Rect::new(abs_x as i32, abs_y as i32, width as u32, height as u32);
            buffer.fill_rect(subrect, &pixel_local).with_context(|| {
                format!(
                    "Failed to fill CoRRE subrect {} at ({}, {}) size {}x{}",
                    i, abs_x, abs_y, width, height
                )
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfb_pixelbuffer::{ManagedPixelBuffer, PixelBuffer};
    use std::io::Cursor;

    fn test_pixel_format() -> crate::PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: 0,
            true_color: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    fn make_corre_packet(bg: &[u8], subrects: &[(&[u8], u8, u8, u8, u8)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(subrects.len() as u32).to_be_bytes());
        data.extend_from_slice(bg);
        for (pixel, x, y, w, h) in subrects {
            data.extend_from_slice(pixel);
            data.push(*x);
            data.push(*y);
            data.push(*w);
            data.push(*h);
        }
        data
    }

    fn get_pixel(buffer: &ManagedPixelBuffer, x: i32, y: i32) -> [u8; 4] {
        let rect = Rect::new(x, y, 1, 1);
        let mut stride = 0;
        let pixels = buffer.get_buffer(rect, &mut stride).unwrap();
        [pixels[0], pixels[1], pixels[2], pixels[3]]
    }

    #[tokio::test]
    async fn decoder_type_is_corre() {
        let decoder = CoRREDecoder;
        assert_eq!(decoder.encoding_type(), ENCODING_CORRE);
    }

    #[tokio::test]
    async fn background_only_fills_whole_rect() {
        let decoder = CoRREDecoder;
        let pixel_format = test_pixel_format();
        let mut buffer = ManagedPixelBuffer::new_local(100, 100);

        let rect = Rectangle {
            x: 5,
            y: 5,
            width: 10,
            height: 10,
            encoding: ENCODING_CORRE,
        };

        let bg = &[0, 0, 255, 255];
        let data = make_corre_packet(bg, &[]);
        let mut stream = RfbInStream::new(Cursor::new(data));

        decoder
            .decode(&mut stream, &rect, &pixel_format, &mut buffer)
            .await
            .unwrap();

        assert_eq!(get_pixel(&buffer, 5, 5), [0, 0, 255, 255]);
        assert_eq!(get_pixel(&buffer, 14, 14), [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn single_subrectangle_overwrites_background() {
        let decoder = CoRREDecoder;
        let pixel_format = test_pixel_format();
        let mut buffer = ManagedPixelBuffer::new_local(100, 100);

        let rect = Rectangle {
            x: 10,
            y: 10,
            width: 10,
            height: 10,
            encoding: ENCODING_CORRE,
        };

        let blue_bg = &[255, 0, 0, 255];
        let red_sub = &[0, 0, 255, 255];
        let data = make_corre_packet(blue_bg, &[(red_sub, 2, 2, 3, 3)]);
        let mut stream = RfbInStream::new(Cursor::new(data));

        decoder
            .decode(&mut stream, &rect, &pixel_format, &mut buffer)
            .await
            .unwrap();

        assert_eq!(get_pixel(&buffer, 10, 10), [255, 0, 0, 255]);
        assert_eq!(get_pixel(&buffer, 12, 12), [0, 0, 255, 255]);
        assert_eq!(get_pixel(&buffer, 15, 15), [255, 0, 0, 255]);
    }

    #[tokio::test]
    async fn subrect_extending_beyond_rect_is_an_error() {
        let decoder = CoRREDecoder;
        let pixel_format = test_pixel_format();
        let mut buffer = ManagedPixelBuffer::new_local(100, 100);

        let rect = Rectangle {
            x: 10,
            y: 10,
            width: 10,
            height: 10,
            encoding: ENCODING_CORRE,
        };

        let white: &[u8] = &[255, 255, 255, 255];
        let red: &[u8] = &[0, 0, 255, 255];
        let data = make_corre_packet(white, &[(red, 8, 0, 5, 5)]);
        let mut stream = RfbInStream::new(Cursor::new(data));

        let result = decoder
            .decode(&mut stream, &rect, &pixel_format, &mut buffer)
            .await;
        assert!(result.is_err());
        assert!(format!("{:?}", result.unwrap_err()).contains("beyond rectangle"));
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let decoder = CoRREDecoder;
        let pixel_format = test_pixel_format();
        let mut buffer = ManagedPixelBuffer::new_local(100, 100);

        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            encoding: ENCODING_CORRE,
        };

        let mut stream = RfbInStream::new(Cursor::new(Vec::new()));
        let result = decoder
            .decode(&mut stream, &rect, &pixel_format, &mut buffer)
            .await;
        assert!(result.is_err());
    }
}
