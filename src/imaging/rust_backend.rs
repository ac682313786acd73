//! Pure Rust drawing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Allocate | `Vec::try_reserve_exact` + `image::RgbaImage::from_raw` |
//! | Draw scaled | `image::imageops::resize` with `Lanczos3`, then `imageops::overlay` |
//! | Copy band | `image::imageops::crop_imm` + `imageops::overlay` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 100, RGB8) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (RGBA8) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (RGBA8, one frame) |

use super::backend::{BackendError, ImageBackend, Surface, background_for};
use super::params::{ExportFormat, JPEG_QUALITY};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

/// Largest surface the backend will allocate, in pixels.
///
/// 16384 × 16384, the canvas area limit shared by common browsers.
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 268_435_456;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    max_surface_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
        }
    }

    /// Backend with a custom surface budget (see `[limits]` in the config).
    pub fn with_max_surface_pixels(max_surface_pixels: u64) -> Self {
        Self { max_surface_pixels }
    }

    pub fn max_surface_pixels(&self) -> u64 {
        self.max_surface_pixels
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Reserve and fill the raw RGBA buffer, reporting failure instead of aborting.
fn allocate_pixels(width: u32, height: u32, fill: u8) -> Option<RgbaImage> {
    let len = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)?;
    let mut raw = Vec::new();
    raw.try_reserve_exact(len).ok()?;
    raw.resize(len, fill);
    RgbaImage::from_raw(width, height, raw)
}

fn encode_jpeg(pixels: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    // Backgrounds are already opaque white, dropping alpha is lossless here.
    let rgb = DynamicImage::ImageRgba8(pixels.clone()).into_rgb8();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            pixels.as_raw(),
            pixels.width(),
            pixels.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?;
    Ok(out)
}

fn encode_gif(pixels: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    {
        let mut encoder = image::codecs::gif::GifEncoder::new(&mut out);
        encoder
            .encode(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| BackendError::Encode(format!("GIF encode failed: {}", e)))?;
    }
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: ExportFormat,
    ) -> Result<Surface, BackendError> {
        let unavailable = || BackendError::SurfaceUnavailable { width, height };
        if width as u64 * height as u64 > self.max_surface_pixels {
            return Err(unavailable());
        }
        // Both backgrounds are a single repeated byte: 0xFF (white) or 0x00.
        let fill = background_for(format).0[0];
        allocate_pixels(width, height, fill)
            .map(Surface::from_pixels)
            .ok_or_else(unavailable)
    }

    fn draw_scaled(
        &self,
        target: &mut Surface,
        source: &DynamicImage,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<(), BackendError> {
        if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
            return Ok(());
        }
        let rgba = source.to_rgba8();
        // Same size: copy pixels through untouched.
        let scaled = if rgba.dimensions() == (width, height) {
            rgba
        } else {
            imageops::resize(&rgba, width, height, FilterType::Lanczos3)
        };
        imageops::overlay(target.pixels_mut(), &scaled, 0, y as i64);
        Ok(())
    }

    fn copy_band(
        &self,
        target: &mut Surface,
        source: &Surface,
        y: u32,
    ) -> Result<(), BackendError> {
        let band = imageops::crop_imm(source.pixels(), 0, y, target.width(), target.height())
            .to_image();
        imageops::overlay(target.pixels_mut(), &band, 0, 0);
        Ok(())
    }

    fn encode(&self, surface: &Surface, format: ExportFormat) -> Result<Vec<u8>, BackendError> {
        if surface.is_empty() {
            return Err(BackendError::Encode(format!(
                "cannot encode empty {}x{} surface",
                surface.width(),
                surface.height()
            )));
        }
        match format {
            ExportFormat::Jpeg => encode_jpeg(surface.pixels()),
            ExportFormat::Png => encode_png(surface.pixels()),
            ExportFormat::Gif => encode_gif(surface.pixels()),
        }
    }
}
