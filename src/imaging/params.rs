//! Parameter types for image operations.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the [`pipeline`](crate::pipeline) (which decides what to resize,
//! stitch and slice) and the [`backend`](super::backend) (which does the pixel
//! work).
//!
//! ## Types
//!
//! - [`ExportFormat`]: Output container: JPEG, PNG or GIF.
//! - [`Mode`]: Individual (one pipeline per image) or mosaic (stitch first).
//! - [`ProcessingOptions`]: Everything one pipeline invocation needs.
//! - [`SliceParams`]: What the slicer needs from the options.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// JPEG encoding quality. Fixed at maximum so bands of an already downscaled
/// image do not compound loss.
pub const JPEG_QUALITY: u8 = 100;

/// Encoded output format for slices and composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
    Gif,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Png => "image/png",
            ExportFormat::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
            ExportFormat::Gif => "gif",
        }
    }

    /// JPEG has no alpha channel: every surface is filled with opaque white
    /// before drawing, otherwise transparent regions encode as black.
    pub fn needs_opaque_background(self) -> bool {
        matches!(self, ExportFormat::Jpeg)
    }

    /// Largest width or height the encoder accepts. JPEG and GIF store
    /// dimensions as 16-bit fields; PNG has no practical cap.
    pub fn max_dimension(self) -> Option<u32> {
        match self {
            ExportFormat::Jpeg | ExportFormat::Gif => Some(u16::MAX as u32),
            ExportFormat::Png => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Png => "png",
            ExportFormat::Gif => "gif",
        })
    }
}

/// How a batch of sources is turned into slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Each source is resized and sliced on its own.
    #[default]
    Individual,
    /// All sources are stitched into one tall canvas, then sliced once.
    Mosaic,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Individual => "individual",
            Mode::Mosaic => "mosaic",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid options: {0}")]
pub struct InvalidOptions(pub String);

/// Options for one pipeline invocation.
///
/// The pipeline trusts these values. Non-positive dimensions are reported by
/// [`validate`](Self::validate) and turn into an empty result, never into
/// encoder output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub target_width: u32,
    /// Used as-is unless `keep_aspect_ratio` derives a height per source.
    pub target_height: u32,
    pub keep_aspect_ratio: bool,
    pub slice_height: u32,
    pub enable_slicing: bool,
    pub export_format: ExportFormat,
    pub mode: Mode,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            target_width: 1080,
            target_height: 1920,
            keep_aspect_ratio: true,
            slice_height: 1200,
            enable_slicing: true,
            export_format: ExportFormat::Jpeg,
            mode: Mode::Individual,
        }
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<(), InvalidOptions> {
        if self.target_width == 0 {
            return Err(InvalidOptions("target width must be positive".into()));
        }
        // Mosaic derives its height from the stitched canvas and an
        // aspect-locked resize derives it from the source.
        if self.target_height == 0 && !self.keep_aspect_ratio && self.mode == Mode::Individual {
            return Err(InvalidOptions("target height must be positive".into()));
        }
        if self.slice_height == 0 {
            return Err(InvalidOptions("slice height must be positive".into()));
        }
        Ok(())
    }

    pub fn slice_params(&self) -> SliceParams {
        SliceParams {
            slice_height: self.slice_height,
            enabled: self.enable_slicing,
            format: self.export_format,
        }
    }
}

/// What the slicer needs: band height, whether to cut at all, and the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceParams {
    pub slice_height: u32,
    pub enabled: bool,
    pub format: ExportFormat,
}
