//! Cutting a surface into height-bounded bands.
//!
//! The slicer walks a surface top to bottom in bands of at most
//! `slice_height` rows. Each band is drawn into a fresh surface (white first
//! when exporting JPEG, same as the resize step) and encoded on its own, so
//! every slice is a complete image file.
//!
//! ```text
//! y=0     ┌──────────┐  index 0  (slice_height rows)
//!         │          │
//! y=1200  ├──────────┤  index 1  (slice_height rows)
//!         │          │
//! y=2400  ├──────────┤  index 2  (remainder, may be shorter)
//! y=2800  └──────────┘
//! ```

use super::backend::{BackendError, ImageBackend, Surface};
use super::calculations::band_layout;
use super::params::{ExportFormat, SliceParams};
use crate::encoding::{size_label, to_data_url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One encoded band, ready to hand to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResult {
    /// Opaque unique token.
    pub id: String,
    /// Self-contained `data:` URL of the encoded band.
    pub url: String,
    /// 0-based position within its parent image, top to bottom.
    pub index: usize,
    pub format: ExportFormat,
    /// Estimated size for display, see [`crate::encoding`].
    pub size_label: String,
    pub width: u32,
    pub height: u32,
}

impl SliceResult {
    fn from_encoded(bytes: &[u8], index: usize, format: ExportFormat, width: u32, height: u32) -> Self {
        let url = to_data_url(bytes, format);
        Self {
            id: Uuid::new_v4().to_string(),
            size_label: size_label(&url),
            url,
            index,
            format,
            width,
            height,
        }
    }
}

/// Slice `surface` according to `params`.
///
/// - empty surface → no slices
/// - slicing disabled → exactly one slice of the whole surface, index 0
/// - zero `slice_height` with slicing enabled → no slices
/// - otherwise `ceil(height / slice_height)` slices whose heights sum to the
///   surface height
pub fn slice_surface(
    backend: &impl ImageBackend,
    surface: &Surface,
    params: SliceParams,
) -> Result<Vec<SliceResult>, BackendError> {
    if surface.is_empty() {
        return Ok(Vec::new());
    }
    let width = surface.width();

    if !params.enabled {
        let bytes = backend.encode(surface, params.format)?;
        return Ok(vec![SliceResult::from_encoded(
            &bytes,
            0,
            params.format,
            width,
            surface.height(),
        )]);
    }

    let bands = band_layout(surface.height(), params.slice_height);
    let mut slices = Vec::with_capacity(bands.len());
    for (index, band) in bands.into_iter().enumerate() {
        let mut target = backend.allocate(width, band.height, params.format)?;
        backend.copy_band(&mut target, surface, band.y)?;
        let bytes = backend.encode(&target, params.format)?;
        slices.push(SliceResult::from_encoded(
            &bytes,
            index,
            params.format,
            width,
            band.height,
        ));
    }
    Ok(slices)
}
