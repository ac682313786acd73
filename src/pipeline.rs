//! Pipeline orchestration: resize → (stitch) → slice.
//!
//! ## Modes
//!
//! - **Individual**: every source runs its own resize + slice pipeline. The
//!   pipelines are independent: they run in parallel on the rayon pool, and
//!   a failure is recorded in that image's [`ImageOutcome`] without touching
//!   its siblings. The batch completes once every pipeline has finished.
//! - **Mosaic**: all sources are stitched into one canvas at the target
//!   width. The stitched height replaces the target height, and the canvas
//!   is sliced as a single unit. Any failure aborts the whole batch, since
//!   there is only one composite.
//!
//! ## Status
//!
//! Each image moves `pending → processing → completed | error`. The final
//! status is part of the returned outcome; callers that want live updates
//! pass a channel and receive [`PipelineEvent`]s as they happen.
//!
//! ## Invalid options
//!
//! Options failing [`ProcessingOptions::validate`] produce an empty result:
//! individual images complete with zero slices, a mosaic has no slices and
//! no composite. Nothing is encoded.

use crate::encoding::{size_label, to_data_url};
use crate::imaging::{
    BackendError, ImageBackend, Mode, ProcessingOptions, SliceResult, check_encodable,
    resize_image, scaled_height, slice_surface, stitch_images, stitch_layout,
};
use crate::source::SourceImage;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Mosaic failed: {0}")]
    Mosaic(#[from] BackendError),
}

/// Lifecycle of one image within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Progress notifications, sent while the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    BatchStarted {
        mode: Mode,
        image_count: usize,
    },
    StatusChanged {
        id: String,
        name: String,
        status: ImageStatus,
        /// Slices produced, once completed.
        slice_count: Option<usize>,
        /// Failure message, once errored.
        error: Option<String>,
    },
    MosaicFinished {
        width: u32,
        height: u32,
        slice_count: usize,
    },
}

/// Result of one image's pipeline in individual mode.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub id: String,
    pub name: String,
    pub status: ImageStatus,
    /// Resized dimensions (zero when the image failed before resizing).
    pub width: u32,
    pub height: u32,
    pub slices: Vec<SliceResult>,
    pub error: Option<String>,
}

impl ImageOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == ImageStatus::Completed
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndividualOutput {
    /// One outcome per source, in input order.
    pub outcomes: Vec<ImageOutcome>,
}

impl IndividualOutput {
    /// Image id → ordered slices, for completed images only.
    pub fn slices_by_id(&self) -> HashMap<&str, &[SliceResult]> {
        self.outcomes
            .iter()
            .filter(|o| o.is_completed())
            .map(|o| (o.id.as_str(), o.slices.as_slice()))
            .collect()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ImageStatus::Error)
    }
}

/// The stitched canvas, encoded whole.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeImage {
    pub id: String,
    /// Data URL of the full canvas; the display form of the composite.
    pub original_url: String,
    pub width: u32,
    pub height: u32,
    pub size_label: String,
}

#[derive(Debug, Clone, Default)]
pub struct MosaicOutput {
    pub slices: Vec<SliceResult>,
    /// `None` when there was nothing to stitch or the options were invalid.
    pub composite: Option<CompositeImage>,
}

#[derive(Debug, Clone)]
pub enum PipelineOutput {
    Individual(IndividualOutput),
    Mosaic(MosaicOutput),
}

fn emit(events: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn status_event(
    source: &SourceImage,
    status: ImageStatus,
    slice_count: Option<usize>,
    error: Option<String>,
) -> PipelineEvent {
    PipelineEvent::StatusChanged {
        id: source.id.clone(),
        name: source.name.clone(),
        status,
        slice_count,
        error,
    }
}

/// Output height for one source in individual mode.
pub fn target_height_for(source: &SourceImage, options: &ProcessingOptions) -> u32 {
    if options.keep_aspect_ratio {
        scaled_height((source.width(), source.height()), options.target_width)
    } else {
        options.target_height
    }
}

/// Run the pipeline in the mode selected by `options`.
///
/// Only mosaic mode can fail as a whole; individual failures are recorded
/// per image.
pub fn run(
    backend: &impl ImageBackend,
    sources: &[SourceImage],
    options: &ProcessingOptions,
    events: Option<Sender<PipelineEvent>>,
) -> Result<PipelineOutput, PipelineError> {
    emit(
        events.as_ref(),
        PipelineEvent::BatchStarted {
            mode: options.mode,
            image_count: sources.len(),
        },
    );
    match options.mode {
        Mode::Individual => Ok(PipelineOutput::Individual(run_individual(
            backend,
            sources,
            options,
            events.as_ref(),
        ))),
        Mode::Mosaic => {
            run_mosaic(backend, sources, options, events.as_ref()).map(PipelineOutput::Mosaic)
        }
    }
}

/// Resize and slice every source independently, in parallel.
pub fn run_individual(
    backend: &impl ImageBackend,
    sources: &[SourceImage],
    options: &ProcessingOptions,
    events: Option<&Sender<PipelineEvent>>,
) -> IndividualOutput {
    for source in sources {
        emit(events, status_event(source, ImageStatus::Pending, None, None));
    }

    if let Err(e) = options.validate() {
        warn!(error = %e, "skipping batch; every image yields zero slices");
        let outcomes = sources
            .iter()
            .map(|source| {
                emit(
                    events,
                    status_event(source, ImageStatus::Completed, Some(0), None),
                );
                ImageOutcome {
                    id: source.id.clone(),
                    name: source.name.clone(),
                    status: ImageStatus::Completed,
                    width: 0,
                    height: 0,
                    slices: Vec::new(),
                    error: None,
                }
            })
            .collect();
        return IndividualOutput { outcomes };
    }

    let outcomes = sources
        .par_iter()
        .map(|source| process_one(backend, source, options, events))
        .collect();
    IndividualOutput { outcomes }
}

fn process_one(
    backend: &impl ImageBackend,
    source: &SourceImage,
    options: &ProcessingOptions,
    events: Option<&Sender<PipelineEvent>>,
) -> ImageOutcome {
    emit(events, status_event(source, ImageStatus::Processing, None, None));

    let width = options.target_width;
    let height = target_height_for(source, options);
    debug!(name = %source.name, width, height, "resizing");

    // The largest piece that gets encoded: one band, or the whole image.
    let encoded_height = if options.enable_slicing {
        height.min(options.slice_height)
    } else {
        height
    };
    let result = check_encodable(width, encoded_height, options.export_format)
        .and_then(|()| {
            resize_image(backend, &source.image, width, height, options.export_format)
        })
        .and_then(|surface| slice_surface(backend, &surface, options.slice_params()));

    match result {
        Ok(slices) => {
            info!(name = %source.name, slices = slices.len(), "image completed");
            emit(
                events,
                status_event(source, ImageStatus::Completed, Some(slices.len()), None),
            );
            ImageOutcome {
                id: source.id.clone(),
                name: source.name.clone(),
                status: ImageStatus::Completed,
                width,
                height,
                slices,
                error: None,
            }
        }
        Err(e) => {
            warn!(name = %source.name, error = %e, "image failed");
            emit(
                events,
                status_event(source, ImageStatus::Error, None, Some(e.to_string())),
            );
            ImageOutcome {
                id: source.id.clone(),
                name: source.name.clone(),
                status: ImageStatus::Error,
                width: 0,
                height: 0,
                slices: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Stitch all sources into one canvas, then slice it as a single unit.
pub fn run_mosaic(
    backend: &impl ImageBackend,
    sources: &[SourceImage],
    options: &ProcessingOptions,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<MosaicOutput, PipelineError> {
    if let Err(e) = options.validate() {
        warn!(error = %e, "skipping mosaic; no slices produced");
        return Ok(MosaicOutput::default());
    }
    if sources.is_empty() {
        debug!("nothing to stitch");
        return Ok(MosaicOutput::default());
    }

    // The composite is always encoded whole, so reject it before any drawing.
    let dims: Vec<(u32, u32)> = sources.iter().map(|s| (s.width(), s.height())).collect();
    let (_, canvas_height) = stitch_layout(&dims, options.target_width);
    check_encodable(options.target_width, canvas_height, options.export_format)?;

    let images: Vec<&image::DynamicImage> = sources.iter().map(|s| &s.image).collect();
    let canvas = stitch_images(backend, &images, options.target_width, options.export_format)?;
    if canvas.is_empty() {
        debug!("stitched canvas is empty");
        return Ok(MosaicOutput::default());
    }
    info!(
        width = canvas.width(),
        height = canvas.height(),
        sources = sources.len(),
        "stitched"
    );

    let slices = slice_surface(backend, &canvas, options.slice_params())?;
    let composite = match slices.first() {
        // The single slice already is the whole canvas, encoded the same way.
        Some(whole) if !options.enable_slicing => CompositeImage {
            id: Uuid::new_v4().to_string(),
            original_url: whole.url.clone(),
            width: whole.width,
            height: whole.height,
            size_label: whole.size_label.clone(),
        },
        _ => {
            let bytes = backend.encode(&canvas, options.export_format)?;
            let original_url = to_data_url(&bytes, options.export_format);
            CompositeImage {
                id: Uuid::new_v4().to_string(),
                size_label: size_label(&original_url),
                original_url,
                width: canvas.width(),
                height: canvas.height(),
            }
        }
    };

    emit(
        events,
        PipelineEvent::MosaicFinished {
            width: canvas.width(),
            height: canvas.height(),
            slice_count: slices.len(),
        },
    );
    Ok(MosaicOutput {
        slices,
        composite: Some(composite),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ExportFormat;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::{DynamicImage, RgbaImage};

    fn source(name: &str, width: u32, height: u32) -> SourceImage {
        SourceImage::new(name, DynamicImage::ImageRgba8(RgbaImage::new(width, height)))
    }

    fn options(mode: Mode) -> ProcessingOptions {
        ProcessingOptions {
            target_width: 1000,
            target_height: 1500,
            keep_aspect_ratio: true,
            slice_height: 1200,
            enable_slicing: true,
            export_format: ExportFormat::Jpeg,
            mode,
        }
    }

    fn heights(slices: &[SliceResult]) -> Vec<u32> {
        slices.iter().map(|s| s.height).collect()
    }

    #[test]
    fn individual_aspect_locked_scenario() {
        // 2000x4000 at width 1000 → 1000x2000 → [1200, 800]
        let backend = MockBackend::new();
        let sources = vec![source("tall", 2000, 4000)];
        let out = run_individual(&backend, &sources, &options(Mode::Individual), None);

        let outcome = &out.outcomes[0];
        assert_eq!(outcome.status, ImageStatus::Completed);
        assert_eq!((outcome.width, outcome.height), (1000, 2000));
        assert_eq!(heights(&outcome.slices), vec![1200, 800]);
        assert_eq!(outcome.slices[1].index, 1);
    }

    #[test]
    fn individual_without_aspect_lock_uses_shared_height() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 10, 10), source("b", 40, 10)];
        let opts = ProcessingOptions {
            keep_aspect_ratio: false,
            ..options(Mode::Individual)
        };
        let out = run_individual(&backend, &sources, &opts, None);
        for outcome in &out.outcomes {
            assert_eq!(outcome.height, 1500);
            assert_eq!(heights(&outcome.slices), vec![1200, 300]);
        }
    }

    #[test]
    fn individual_preserves_input_order() {
        let backend = MockBackend::new();
        let sources: Vec<SourceImage> = (0..8)
            .map(|i| source(&format!("img-{i}"), 100, 100 + i))
            .collect();
        let out = run_individual(&backend, &sources, &options(Mode::Individual), None);
        let names: Vec<&str> = out.outcomes.iter().map(|o| o.name.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("img-{i}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn individual_failure_is_isolated() {
        // 1000 x 2000 = 2M px fails; 1000 x 500 = 0.5M px fits.
        let backend = MockBackend::with_max_pixels(1_000_000);
        let sources = vec![source("big", 1000, 2000), source("small", 1000, 500)];
        let out = run_individual(&backend, &sources, &options(Mode::Individual), None);

        assert_eq!(out.outcomes[0].status, ImageStatus::Error);
        assert!(out.outcomes[0].error.as_deref().unwrap().contains("unavailable"));
        assert!(out.outcomes[0].slices.is_empty());
        assert_eq!(out.outcomes[1].status, ImageStatus::Completed);
        assert_eq!(out.outcomes[1].slices.len(), 1);

        let by_id = out.slices_by_id();
        assert_eq!(by_id.len(), 1);
        assert!(by_id.contains_key(out.outcomes[1].id.as_str()));
        assert_eq!(out.failed().count(), 1);
    }

    #[test]
    fn individual_invalid_options_yield_empty_result() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 100, 100)];
        let opts = ProcessingOptions {
            target_width: 0,
            ..options(Mode::Individual)
        };
        let out = run_individual(&backend, &sources, &opts, None);
        assert_eq!(out.outcomes.len(), 1);
        assert_eq!(out.outcomes[0].status, ImageStatus::Completed);
        assert!(out.outcomes[0].slices.is_empty());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn individual_events_follow_status_lifecycle() {
        let backend = MockBackend::new();
        let sources = vec![source("only", 100, 100)];
        let (tx, rx) = std::sync::mpsc::channel();
        run(&backend, &sources, &options(Mode::Individual), Some(tx)).unwrap();

        let events: Vec<PipelineEvent> = rx.iter().collect();
        assert!(matches!(
            events[0],
            PipelineEvent::BatchStarted {
                mode: Mode::Individual,
                image_count: 1
            }
        ));
        let statuses: Vec<ImageStatus> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ImageStatus::Pending,
                ImageStatus::Processing,
                ImageStatus::Completed
            ]
        );
    }

    #[test]
    fn mosaic_scenario_stitches_to_3500() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 800, 1600), source("b", 1200, 1800)];
        let out = run_mosaic(&backend, &sources, &options(Mode::Mosaic), None).unwrap();

        assert_eq!(heights(&out.slices), vec![1200, 1200, 1100]);
        let composite = out.composite.unwrap();
        assert_eq!((composite.width, composite.height), (1000, 3500));
        assert!(composite.original_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn mosaic_without_slicing_reuses_single_slice_as_composite() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 100, 100), source("b", 100, 300)];
        let opts = ProcessingOptions {
            target_width: 50,
            enable_slicing: false,
            ..options(Mode::Mosaic)
        };
        let out = run_mosaic(&backend, &sources, &opts, None).unwrap();
        assert_eq!(out.slices.len(), 1);
        assert_eq!(out.slices[0].height, 200);
        let composite = out.composite.unwrap();
        assert_eq!(composite.original_url, out.slices[0].url);

        let encodes = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Encode { .. }))
            .count();
        assert_eq!(encodes, 1);
    }

    #[test]
    fn mosaic_of_nothing_is_empty() {
        let backend = MockBackend::new();
        let out = run_mosaic(&backend, &[], &options(Mode::Mosaic), None).unwrap();
        assert!(out.slices.is_empty());
        assert!(out.composite.is_none());
    }

    #[test]
    fn mosaic_invalid_options_are_empty() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 100, 100)];
        let opts = ProcessingOptions {
            slice_height: 0,
            ..options(Mode::Mosaic)
        };
        let out = run_mosaic(&backend, &sources, &opts, None).unwrap();
        assert!(out.slices.is_empty());
        assert!(out.composite.is_none());
    }

    #[test]
    fn mosaic_surface_failure_aborts_batch() {
        let backend = MockBackend::with_max_pixels(1000);
        let sources = vec![source("a", 100, 100), source("b", 100, 100)];
        let result = run(&backend, &sources, &options(Mode::Mosaic), None);
        assert!(matches!(
            result,
            Err(PipelineError::Mosaic(BackendError::SurfaceUnavailable { .. }))
        ));
    }

    #[test]
    fn mosaic_taller_than_jpeg_limit_fails_before_drawing() {
        // 4x40000 twice at width 4 → 4x80000, within the pixel budget but
        // past the 65535 JPEG dimension cap.
        let backend = MockBackend::new();
        let sources = vec![source("a", 4, 40_000), source("b", 4, 40_000)];
        let opts = ProcessingOptions {
            target_width: 4,
            ..options(Mode::Mosaic)
        };
        let result = run_mosaic(&backend, &sources, &opts, None);
        assert!(matches!(
            result,
            Err(PipelineError::Mosaic(BackendError::SurfaceUnavailable {
                width: 4,
                height: 80_000
            }))
        ));
        assert!(backend.get_operations().is_empty());

        let png = ProcessingOptions {
            export_format: ExportFormat::Png,
            ..opts
        };
        let out = run_mosaic(&backend, &sources, &png, None).unwrap();
        assert_eq!(out.composite.unwrap().height, 80_000);
    }

    #[test]
    fn individual_tall_jpeg_slices_fine_but_cannot_be_encoded_whole() {
        let backend = MockBackend::new();
        let sources = vec![source("tall", 4, 70_000)];
        let opts = ProcessingOptions {
            target_width: 4,
            ..options(Mode::Individual)
        };
        let out = run_individual(&backend, &sources, &opts, None);
        assert_eq!(out.outcomes[0].status, ImageStatus::Completed);
        assert_eq!(out.outcomes[0].slices.len(), 59);

        let backend = MockBackend::new();
        let whole = ProcessingOptions {
            enable_slicing: false,
            ..opts
        };
        let out = run_individual(&backend, &sources, &whole, None);
        assert_eq!(out.outcomes[0].status, ImageStatus::Error);
        assert!(out.outcomes[0].error.as_deref().unwrap().contains("4x70000"));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn run_dispatches_on_mode() {
        let backend = MockBackend::new();
        let sources = vec![source("a", 100, 100)];
        assert!(matches!(
            run(&backend, &sources, &options(Mode::Individual), None).unwrap(),
            PipelineOutput::Individual(_)
        ));
        assert!(matches!(
            run(&backend, &sources, &options(Mode::Mosaic), None).unwrap(),
            PipelineOutput::Mosaic(_)
        ));
    }
}
