//! Drawing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four primitives every operation is
//! built from: allocate a background-filled surface, draw a source scaled
//! into it, copy a band out of another surface, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so layout logic can be checked without
//! paying for resampling or encoding.

use super::params::ExportFormat;
use image::{Rgba, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("drawing surface unavailable for {width}x{height}")]
    SurfaceUnavailable { width: u32, height: u32 },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Opaque white, the background of every JPEG-bound surface.
pub const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Fully transparent, the background for formats with alpha.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Background a freshly allocated surface is filled with for `format`.
pub fn background_for(format: ExportFormat) -> Rgba<u8> {
    if format.needs_opaque_background() {
        OPAQUE_WHITE
    } else {
        TRANSPARENT
    }
}

/// Fail with `SurfaceUnavailable` when a `width × height` image could not be
/// encoded as `format` in one piece.
pub fn check_encodable(
    width: u32,
    height: u32,
    format: ExportFormat,
) -> Result<(), BackendError> {
    match format.max_dimension() {
        Some(max) if width > max || height > max => {
            Err(BackendError::SurfaceUnavailable { width, height })
        }
        _ => Ok(()),
    }
}

/// An RGBA pixel buffer owned by exactly one operation at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn from_pixels(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

/// Trait for drawing backends.
///
/// Every operation in [`operations`](super::operations) and
/// [`slicer`](super::slicer) goes through these primitives, so the rest of
/// the crate is backend-agnostic.
pub trait ImageBackend: Sync {
    /// Allocate an exact `width × height` surface filled with the format's
    /// background (see [`background_for`]).
    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: ExportFormat,
    ) -> Result<Surface, BackendError>;

    /// Draw `source` scaled to exactly `width × height` onto `target` at `(0, y)`.
    fn draw_scaled(
        &self,
        target: &mut Surface,
        source: &image::DynamicImage,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), BackendError>;

    /// Copy rows `[y, y + target.height())` of `source` onto `target`.
    fn copy_band(&self, target: &mut Surface, source: &Surface, y: u32)
    -> Result<(), BackendError>;

    /// Encode the surface into a standalone image file.
    fn encode(&self, surface: &Surface, format: ExportFormat) -> Result<Vec<u8>, BackendError>;
}
