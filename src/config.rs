//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `longstrip.toml`. Stock defaults
//! are serialized to TOML, the user file is overlaid on top key by key, and
//! the merged result is validated. CLI flags override the merged config last.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! mode = "individual"       # "individual" or "mosaic"
//!
//! [resize]
//! width = 1080              # Target width in pixels
//! height = 1920             # Target height, used when keep_aspect_ratio = false
//! keep_aspect_ratio = true  # Derive height from each source's aspect ratio
//!
//! [slicing]
//! enabled = true            # Cut the result into bands
//! height = 1200             # Maximum band height in pixels
//!
//! [output]
//! format = "jpeg"           # "jpeg", "png" or "gif"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [limits]
//! max_surface_pixels = 268435456  # Largest drawing surface, in pixels
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! [slicing]
//! height = 1600
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DEFAULT_MAX_SURFACE_PIXELS, ExportFormat, Mode, ProcessingOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILENAME: &str = "longstrip.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `longstrip.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Individual images or one stitched mosaic.
    pub mode: Mode,
    /// Target resolution.
    pub resize: ResizeConfig,
    /// Band cutting.
    pub slicing: SlicingConfig,
    /// Encoded format.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Resource limits.
    pub limits: LimitsConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.width == 0 {
            return Err(ConfigError::Validation(
                "resize.width must be positive".into(),
            ));
        }
        if self.resize.height == 0 && !self.resize.keep_aspect_ratio {
            return Err(ConfigError::Validation(
                "resize.height must be positive when keep_aspect_ratio is false".into(),
            ));
        }
        if self.slicing.height == 0 {
            return Err(ConfigError::Validation(
                "slicing.height must be positive".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.limits.max_surface_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_surface_pixels must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The per-run options this config describes.
    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            target_width: self.resize.width,
            target_height: self.resize.height,
            keep_aspect_ratio: self.resize.keep_aspect_ratio,
            slice_height: self.slicing.height,
            enable_slicing: self.slicing.enabled,
            export_format: self.output.format,
            mode: self.mode,
        }
    }
}

/// Target resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels when the aspect ratio is not kept.
    pub height: u32,
    /// Derive each image's height from its own aspect ratio.
    pub keep_aspect_ratio: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let options = ProcessingOptions::default();
        Self {
            width: options.target_width,
            height: options.target_height,
            keep_aspect_ratio: options.keep_aspect_ratio,
        }
    }
}

/// Band cutting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlicingConfig {
    /// When false the whole resized image is a single slice.
    pub enabled: bool,
    /// Maximum height of one band.
    pub height: u32,
}

impl Default for SlicingConfig {
    fn default() -> Self {
        let options = ProcessingOptions::default();
        Self {
            enabled: options.enable_slicing,
            height: options.slice_height,
        }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: ExportFormat,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image pipelines.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest drawing surface the backend allocates, in pixels. Resizes or
    /// mosaics beyond it fail with "surface unavailable". The JPEG/GIF
    /// 65535-per-side cap applies on top and is not configurable.
    pub max_surface_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(PipelineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `longstrip.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `longstrip.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `longstrip.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# longstrip configuration
# ======================
#
# Every key is optional. Values shown are the defaults. Command-line flags
# override anything set here.

# How sources are combined:
#   "individual" - each image is resized and sliced on its own
#   "mosaic"     - all images are scaled to one width, stacked top to bottom
#                  in input order, then sliced as a single long image
mode = "individual"

[resize]
# Output width in pixels.
width = 1080
# Output height in pixels. Only used when keep_aspect_ratio = false.
height = 1920
# Derive each image's height from its own aspect ratio at the target width.
keep_aspect_ratio = true

[slicing]
# Cut the resized image into bands. When false, each image (or the mosaic)
# is exported whole.
enabled = true
# Maximum band height in pixels. The last band may be shorter.
height = 1200

[output]
# Encoded format: "jpeg" (quality 100, white background), "png" or "gif".
format = "jpeg"

[processing]
# Maximum parallel image pipelines. Omit to use every CPU core.
# max_processes = 4

[limits]
# Largest drawing surface in pixels (16384 x 16384). Larger resizes and
# mosaics fail instead of exhausting memory.
# Independently, JPEG and GIF cap each side at 65535 pixels. A mosaic canvas
# or an unsliced image past that fails up front; slices only need each band
# to fit.
max_surface_pixels = 268435456
"##
}
