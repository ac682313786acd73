//! # Longstrip
//!
//! Prepares images for platforms that cap the height of a single upload.
//! Each image is resized to a target width, optionally stitched with its
//! siblings into one tall canvas, and cut top-to-bottom into slices no
//! taller than a configured height.
//!
//! # Architecture: Resize → Stitch → Slice
//!
//! ```text
//! Individual   image  →  resize  →  slice  →  [slice 0, slice 1, …]     (per image, in parallel)
//! Mosaic       images →  stitch  →  slice  →  [slice 0, slice 1, …]     (one canvas)
//! ```
//!
//! Every stage works on a [`imaging::Surface`] through the
//! [`imaging::ImageBackend`] trait, so pipeline logic is tested against a
//! recording mock without encoding a single pixel. Slices come back as
//! base64 data URLs; writing them to disk is a separate step in [`export`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`source`] | Decodes input files and directories into [`source::SourceImage`]s |
//! | [`imaging`] | Geometry, drawing surfaces, resize, stitch, and band slicing |
//! | [`pipeline`] | Runs individual or mosaic mode, reports per-image status |
//! | [`encoding`] | Data URLs and human-readable size labels |
//! | [`advisor`] | Optional slice-height suggestions behind a trait |
//! | [`config`] | `longstrip.toml` loading, stock defaults, validation |
//! | [`export`] | Writes slices, composite, and `manifest.json` |
//! | [`output`] | CLI output formatting for events and summaries |
//!
//! # Design Decisions
//!
//! ## Opaque Backgrounds For JPEG
//!
//! JPEG has no alpha channel. Surfaces destined for JPEG are filled with
//! opaque white before drawing, so transparent source regions come out
//! white rather than black. PNG and GIF surfaces start transparent.
//!
//! ## Last Slice Takes The Remainder
//!
//! Slices are taken from the top at a fixed height; the final slice is
//! whatever is left. There is no overlap, no padding, and no attempt to
//! balance slice heights. Concatenating the slices vertically reproduces
//! the resized image exactly.
//!
//! ## Bounded Surfaces
//!
//! Surface allocation is fallible. A canvas that exceeds the configured
//! pixel budget, or that the allocator refuses, fails that image (or the
//! whole mosaic) with [`imaging::BackendError::SurfaceUnavailable`] rather
//! than aborting the process.

pub mod advisor;
pub mod config;
pub mod encoding;
pub mod export;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod source;
