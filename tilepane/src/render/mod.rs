//! Rendering seam between the tile engine and its host.
//!
//! The engine never draws. It hands each fetched tile body to the host's
//! [`RenderContext`] for decoding, stores the resulting [`TileBitmap`], and
//! nudges the host to repaint when a new tile becomes ready. Decoded bitmaps
//! belong to the context that produced them: when the host swaps or loses
//! its context, the cache drops every bitmap and completions that arrive
//! without a live context discard their payload.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use thiserror::Error;

/// A decoded tile image, RGBA8, row-major.
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct TileBitmap {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl TileBitmap {
    /// Wraps an already-decoded pixel buffer.
    ///
    /// `pixels` must hold exactly `width * height` RGBA8 pixels.
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw RGBA8 pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for TileBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Error returned when a tile body cannot be decoded into a bitmap.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to decode tile image: {0}")]
pub struct DecodeError(pub String);

/// Host-side rendering services.
///
/// Implementations must be callable from worker tasks: tile completions
/// decode on whatever task the fetch finished on.
pub trait RenderContext: Send + Sync {
    /// Decodes an encoded tile image (PNG on the wire) into a bitmap.
    fn decode_bitmap(&self, encoded: &[u8]) -> Result<TileBitmap, DecodeError>;

    /// Asks the host to schedule a repaint.
    ///
    /// Called after a tile transitions to ready. Must be cheap and
    /// non-blocking; hosts typically just set a flag or post an event.
    fn request_redraw(&self);
}

/// CPU-side render context.
///
/// Decodes with the `image` crate and records redraw requests in a flag the
/// host's draw loop polls. Suits terminal and headless hosts that repaint
/// on their own cadence.
#[derive(Debug, Default)]
pub struct SoftwareRenderContext {
    redraw: AtomicBool,
}

impl SoftwareRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a repaint was requested, clearing the flag.
    pub fn take_redraw(&self) -> bool {
        self.redraw.swap(false, Ordering::AcqRel)
    }
}

impl RenderContext for SoftwareRenderContext {
    fn decode_bitmap(&self, encoded: &[u8]) -> Result<TileBitmap, DecodeError> {
        let img = image::load_from_memory(encoded)
            .map_err(|e| DecodeError(format!("image decode error: {}", e)))?;
        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        if width == 0 || height == 0 {
            return Err(DecodeError(format!(
                "decoded image has zero dimension: {}x{}",
                width, height
            )));
        }
        Ok(TileBitmap::new(width, height, Bytes::from(rgba.into_raw())))
    }

    fn request_redraw(&self) {
        self.redraw.store(true, Ordering::Release);
    }
}
