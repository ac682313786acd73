//! Optional slice-height suggestions.
//!
//! An advisor looks at an image and proposes a slice height (an AI service,
//! a heuristic, anything implementing [`SliceAdvisor`]). It is injected by
//! the caller and consulted *before* a pipeline run; the pipeline itself
//! never calls it. A missing advisor, a failed call or an unusable answer all
//! leave the configured height in place.

use image::DynamicImage;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
    #[error("unusable suggestion: {0}")]
    InvalidSuggestion(String),
}

/// What an advisor proposes, with a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSuggestion {
    pub suggested_height: f64,
    pub reason: String,
}

pub trait SliceAdvisor: Send + Sync {
    fn analyze(&self, image: &DynamicImage) -> Result<SliceSuggestion, AdvisorError>;
}

/// Ask `advisor` for a slice height, falling back to `current`.
///
/// Failures and non-positive or non-finite suggestions are logged and
/// ignored. Never returns zero when `current` is positive.
pub fn advise_slice_height(
    advisor: Option<&dyn SliceAdvisor>,
    image: &DynamicImage,
    current: u32,
) -> u32 {
    let Some(advisor) = advisor else {
        return current;
    };
    match advisor.analyze(image).and_then(validate) {
        Ok((height, reason)) => {
            info!(height, %reason, "using suggested slice height");
            height
        }
        Err(e) => {
            warn!(error = %e, current, "slice advisor failed; keeping configured height");
            current
        }
    }
}

fn validate(suggestion: SliceSuggestion) -> Result<(u32, String), AdvisorError> {
    let h = suggestion.suggested_height.round();
    if !h.is_finite() || h < 1.0 || h > u32::MAX as f64 {
        return Err(AdvisorError::InvalidSuggestion(format!(
            "height {}",
            suggestion.suggested_height
        )));
    }
    Ok((h as u32, suggestion.reason))
}

/// Local advisor that suggests bands of a fixed aspect ratio.
///
/// For a `w:h` ratio and an image of width `W` it proposes `round(W * h / w)`,
/// so every full band matches the platform's preferred frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioAdvisor {
    pub ratio: (u32, u32),
}

impl Default for RatioAdvisor {
    fn default() -> Self {
        Self { ratio: (3, 4) }
    }
}

impl RatioAdvisor {
    /// Parse `"W:H"`, e.g. `"3:4"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (w, h) = s.split_once(':')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        (w > 0 && h > 0).then_some(Self { ratio: (w, h) })
    }
}

impl SliceAdvisor for RatioAdvisor {
    fn analyze(&self, image: &DynamicImage) -> Result<SliceSuggestion, AdvisorError> {
        let (w, h) = self.ratio;
        if w == 0 {
            return Err(AdvisorError::Unavailable("ratio width is zero".into()));
        }
        Ok(SliceSuggestion {
            suggested_height: image.width() as f64 * h as f64 / w as f64,
            reason: format!("{}:{} bands at width {}", w, h, image.width()),
        })
    }
}
