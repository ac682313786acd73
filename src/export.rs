//! Writing pipeline results to disk.
//!
//! The pipeline hands back data URLs; the CLI turns them into files:
//!
//! ```text
//! slices/
//! ├── manifest.json          # every written file, with size and checksum
//! ├── cover-000.jpg          # individual mode: <name>-<index>.<ext>
//! ├── cover-001.jpg
//! ├── cover-2-000.jpg        # a second input also named "cover"
//! ├── mosaic.jpg             # mosaic mode: the whole stitched canvas
//! ├── mosaic-000.jpg         #              and its slices
//! └── mosaic-001.jpg
//! ```

use crate::encoding::{EncodingError, decode_data_url};
use crate::imaging::{ExportFormat, SliceResult};
use crate::pipeline::{CompositeImage, ImageStatus, IndividualOutput, MosaicOutput};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the manifest written next to the slices.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Base name used for mosaic outputs.
pub const MOSAIC_NAME: &str = "mosaic";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid slice payload: {0}")]
    Payload(#[from] EncodingError),
}

/// One written file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFile {
    /// Source image name, or `"mosaic"`.
    pub image: String,
    /// Slice index; `None` for a whole mosaic composite.
    pub index: Option<usize>,
    /// File name relative to the output directory.
    pub file: String,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    /// Estimated size shown to users.
    pub size_label: String,
    /// Exact size on disk.
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportManifest {
    pub files: Vec<ExportedFile>,
    /// Images that failed and were left out.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedImage {
    pub image: String,
    pub error: String,
}

/// `<name>-<index:03>.<ext>`
pub fn slice_filename(name: &str, index: usize, format: ExportFormat) -> String {
    format!("{}-{:0>3}.{}", name, index, format.extension())
}

/// Claim a file stem not used earlier in this export: `name`, then
/// `name-2`, `name-3`, ...
fn unique_stem(name: &str, used: &mut HashSet<String>) -> String {
    let mut stem = name.to_string();
    let mut n = 1;
    while !used.insert(stem.clone()) {
        n += 1;
        stem = format!("{}-{}", name, n);
    }
    stem
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Decode one data URL, write it under `entry.file`, and fill in the
/// entry's size and checksum.
fn write_payload(
    output_dir: &Path,
    url: &str,
    mut entry: ExportedFile,
) -> Result<ExportedFile, ExportError> {
    let bytes = decode_data_url(url)?;
    std::fs::write(output_dir.join(&entry.file), &bytes)?;
    entry.bytes = bytes.len() as u64;
    entry.sha256 = sha256_hex(&bytes);
    Ok(entry)
}

fn write_slices(
    output_dir: &Path,
    name: &str,
    stem: &str,
    slices: &[SliceResult],
) -> Result<Vec<ExportedFile>, ExportError> {
    slices
        .iter()
        .map(|slice| {
            let entry = ExportedFile {
                image: name.to_string(),
                index: Some(slice.index),
                file: slice_filename(stem, slice.index, slice.format),
                format: slice.format,
                width: slice.width,
                height: slice.height,
                size_label: slice.size_label.clone(),
                bytes: 0,
                sha256: String::new(),
            };
            write_payload(output_dir, &slice.url, entry)
        })
        .collect()
}

fn write_composite(
    output_dir: &Path,
    composite: &CompositeImage,
    format: ExportFormat,
) -> Result<ExportedFile, ExportError> {
    let entry = ExportedFile {
        image: MOSAIC_NAME.to_string(),
        index: None,
        file: format!("{}.{}", MOSAIC_NAME, format.extension()),
        format,
        width: composite.width,
        height: composite.height,
        size_label: composite.size_label.clone(),
        bytes: 0,
        sha256: String::new(),
    };
    write_payload(output_dir, &composite.original_url, entry)
}

fn write_manifest(output_dir: &Path, manifest: &ExportManifest) -> Result<PathBuf, ExportError> {
    let path = output_dir.join(MANIFEST_FILENAME);
    std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
    Ok(path)
}

/// Write every completed image's slices; failed images are listed, not written.
///
/// Images sharing a name get distinct file stems in input order, so no
/// output overwrites another.
pub fn export_individual(
    output_dir: &Path,
    output: &IndividualOutput,
) -> Result<ExportManifest, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let mut manifest = ExportManifest::default();
    let mut used = HashSet::new();
    for outcome in &output.outcomes {
        match outcome.status {
            ImageStatus::Completed => {
                let stem = unique_stem(&outcome.name, &mut used);
                manifest.files.extend(write_slices(
                    output_dir,
                    &outcome.name,
                    &stem,
                    &outcome.slices,
                )?);
            }
            _ => manifest.failed.push(FailedImage {
                image: outcome.name.clone(),
                error: outcome.error.clone().unwrap_or_default(),
            }),
        }
    }
    write_manifest(output_dir, &manifest)?;
    Ok(manifest)
}

/// Write the mosaic composite and its slices.
pub fn export_mosaic(
    output_dir: &Path,
    output: &MosaicOutput,
    format: ExportFormat,
) -> Result<ExportManifest, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let mut manifest = ExportManifest::default();
    if let Some(composite) = &output.composite {
        manifest
            .files
            .push(write_composite(output_dir, composite, format)?);
    }
    manifest
        .files
        .extend(write_slices(output_dir, MOSAIC_NAME, MOSAIC_NAME, &output.slices)?);
    write_manifest(output_dir, &manifest)?;
    Ok(manifest)
}
