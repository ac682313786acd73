//! Image transforms: pure Rust, built on the `image` crate.
//!
//! | Operation | Where |
//! |---|---|
//! | **Resize** | [`resize_image`]: Lanczos3 onto a background-filled surface |
//! | **Stitch** | [`stitch_images`]: sources scaled to one width, stacked in order |
//! | **Slice** | [`slice_surface`]: bands of bounded height, each encoded on its own |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and band math (unit testable)
//! - **Parameters**: Formats, modes and options describing a run
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Resize and stitch, combining calculations + backend
//! - **Slicer**: Band layout + per-band encoding into [`SliceResult`]s

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod slicer;

pub use backend::{BackendError, ImageBackend, Surface, check_encodable};
pub use calculations::{
    Band, StitchSlot, band_layout, scaled_height, slice_count, stitch_layout,
};
pub use operations::{resize_image, stitch_images};
pub use params::{
    ExportFormat, InvalidOptions, JPEG_QUALITY, Mode, ProcessingOptions, SliceParams,
};
pub use rust_backend::{DEFAULT_MAX_SURFACE_PIXELS, RustBackend};
pub use slicer::{SliceResult, slice_surface};
