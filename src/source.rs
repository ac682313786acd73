//! Source images: decoded pixels plus identity.
//!
//! Decoding happens here, before anything reaches the pipeline. An input
//! that cannot be read or decoded is reported as a [`LoadError`] for that
//! input alone; the remaining inputs still load.
//!
//! Inputs may be files or directories. Directories are walked recursively
//! and their images are taken in file-name order, which is the order a
//! mosaic stacks them in.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Unsupported image type: {0}")]
    Unsupported(PathBuf),
}

/// Extensions whose decoders are compiled in.
const SUPPORTED: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("bmp", ImageFormat::Bmp),
];

pub fn supported_input_extensions() -> impl Iterator<Item = &'static str> {
    SUPPORTED
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| supported_input_extensions().any(|s| e.eq_ignore_ascii_case(s)))
}

/// A decoded image with a stable identity for the duration of a run.
///
/// Owned by the caller; the pipeline only borrows it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: String,
    /// Display name, usually the file stem.
    pub name: String,
    pub image: DynamicImage,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode one image file.
pub fn load_image(path: &Path) -> Result<SourceImage, LoadError> {
    if !is_supported(path) {
        return Err(LoadError::Unsupported(path.to_path_buf()));
    }
    let image = ImageReader::open(path)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|e| LoadError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded");
    Ok(SourceImage::new(name, image))
}

/// Expand inputs into image paths: files as given, directories walked and
/// sorted by file name. Unsupported files inside directories are skipped;
/// explicitly named files are kept so their error can be reported.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            paths.append(&mut found);
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

/// Load every input, keeping per-input failures alongside successes.
pub fn load_sources(inputs: &[PathBuf]) -> Vec<(PathBuf, Result<SourceImage, LoadError>)> {
    collect_inputs(inputs)
        .into_iter()
        .map(|path| {
            let result = load_image(&path);
            (path, result)
        })
        .collect()
}
