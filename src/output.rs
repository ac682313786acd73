//! CLI output formatting.
//!
//! Each entity leads with its positional index and name, with details on
//! indented lines underneath:
//!
//! ```text
//! Individual (2 images)
//! 001 cover: processing
//! 001 cover: completed (2 slices)
//! 002 broken: error: drawing surface unavailable for 90000x90000
//!
//! 001 cover  1080x2160
//!     000 1080x1200  412.3 KB
//!     001 1080x960   301.7 KB
//! Wrote 2 files to slices/
//! ```
//!
//! Format functions return `Vec<String>` and do no I/O. `main` prints them.

use crate::export::ExportManifest;
use crate::imaging::{Mode, SliceResult};
use crate::pipeline::{ImageStatus, IndividualOutput, MosaicOutput, PipelineEvent};
use std::collections::HashMap;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn status_str(status: ImageStatus) -> &'static str {
    match status {
        ImageStatus::Pending => "pending",
        ImageStatus::Processing => "processing",
        ImageStatus::Completed => "completed",
        ImageStatus::Error => "error",
    }
}

fn slice_lines(slices: &[SliceResult], depth: usize) -> Vec<String> {
    slices
        .iter()
        .map(|s| {
            format!(
                "{}{:0>3} {:<10} {}",
                indent(depth),
                s.index,
                format!("{}x{}", s.width, s.height),
                s.size_label
            )
        })
        .collect()
}

/// Tracks input positions so progress lines can show `001 name`.
///
/// Pending events arrive in input order, before any other status for the
/// same image.
#[derive(Debug, Default)]
pub struct EventFormatter {
    positions: HashMap<String, usize>,
}

impl EventFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for one event. Pending events are silent.
    pub fn format(&mut self, event: &PipelineEvent) -> Vec<String> {
        match event {
            PipelineEvent::BatchStarted { mode, image_count } => {
                let title = match mode {
                    Mode::Individual => "Individual",
                    Mode::Mosaic => "Mosaic",
                };
                vec![format!("{} ({})", title, plural(*image_count, "image"))]
            }
            PipelineEvent::StatusChanged {
                id,
                name,
                status,
                slice_count,
                error,
            } => {
                let next = self.positions.len() + 1;
                let pos = *self.positions.entry(id.clone()).or_insert(next);
                let head = format!("{} {}", format_index(pos), name);
                match status {
                    ImageStatus::Pending => Vec::new(),
                    ImageStatus::Processing => vec![format!("{}: processing", head)],
                    ImageStatus::Completed => vec![format!(
                        "{}: completed ({})",
                        head,
                        plural(slice_count.unwrap_or(0), "slice")
                    )],
                    ImageStatus::Error => vec![format!(
                        "{}: error: {}",
                        head,
                        error.as_deref().unwrap_or("unknown")
                    )],
                }
            }
            PipelineEvent::MosaicFinished {
                width,
                height,
                slice_count,
            } => vec![format!(
                "Stitched {}x{} ({})",
                width,
                height,
                plural(*slice_count, "slice")
            )],
        }
    }
}

/// Per-image summary of an individual run.
pub fn format_individual_summary(output: &IndividualOutput) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, outcome) in output.outcomes.iter().enumerate() {
        let head = format!("{} {}", format_index(i + 1), outcome.name);
        match outcome.status {
            ImageStatus::Completed => {
                lines.push(format!("{}  {}x{}", head, outcome.width, outcome.height));
                lines.extend(slice_lines(&outcome.slices, 1));
            }
            status => lines.push(format!(
                "{}  {}: {}",
                head,
                status_str(status),
                outcome.error.as_deref().unwrap_or("")
            )),
        }
    }
    lines
}

/// Summary of a mosaic run.
pub fn format_mosaic_summary(output: &MosaicOutput) -> Vec<String> {
    let Some(composite) = &output.composite else {
        return vec!["Mosaic: nothing to stitch".to_string()];
    };
    let mut lines = vec![format!(
        "Mosaic  {}x{}  {}",
        composite.width, composite.height, composite.size_label
    )];
    lines.extend(slice_lines(&output.slices, 1));
    lines
}

/// Closing line after export.
pub fn format_export_summary(manifest: &ExportManifest, output_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Wrote {} to {}/",
        plural(manifest.files.len(), "file"),
        output_dir.display()
    )];
    if !manifest.failed.is_empty() {
        lines.push(format!(
            "Skipped {}: {}",
            plural(manifest.failed.len(), "failed image"),
            manifest
                .failed
                .iter()
                .map(|f| f.image.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::FailedImage;
    use crate::imaging::ExportFormat;
    use crate::pipeline::{CompositeImage, ImageOutcome};

    fn status(id: &str, name: &str, status: ImageStatus) -> PipelineEvent {
        PipelineEvent::StatusChanged {
            id: id.into(),
            name: name.into(),
            status,
            slice_count: (status == ImageStatus::Completed).then_some(2),
            error: (status == ImageStatus::Error).then(|| "surface unavailable".into()),
        }
    }

    fn slice(index: usize, height: u32) -> SliceResult {
        SliceResult {
            id: format!("s{index}"),
            url: String::new(),
            index,
            format: ExportFormat::Jpeg,
            size_label: "1.0 KB".into(),
            width: 1080,
            height,
        }
    }

    #[test]
    fn batch_header() {
        let mut f = EventFormatter::new();
        let lines = f.format(&PipelineEvent::BatchStarted {
            mode: Mode::Individual,
            image_count: 2,
        });
        assert_eq!(lines, vec!["Individual (2 images)"]);
        let lines = f.format(&PipelineEvent::BatchStarted {
            mode: Mode::Mosaic,
            image_count: 1,
        });
        assert_eq!(lines, vec!["Mosaic (1 image)"]);
    }

    #[test]
    fn positions_follow_pending_order() {
        let mut f = EventFormatter::new();
        assert!(f.format(&status("a", "first", ImageStatus::Pending)).is_empty());
        assert!(f.format(&status("b", "second", ImageStatus::Pending)).is_empty());

        // Completion order differs from input order.
        assert_eq!(
            f.format(&status("b", "second", ImageStatus::Completed)),
            vec!["002 second: completed (2 slices)"]
        );
        assert_eq!(
            f.format(&status("a", "first", ImageStatus::Error)),
            vec!["001 first: error: surface unavailable"]
        );
    }

    #[test]
    fn mosaic_finished_line() {
        let mut f = EventFormatter::new();
        let lines = f.format(&PipelineEvent::MosaicFinished {
            width: 1000,
            height: 3500,
            slice_count: 3,
        });
        assert_eq!(lines, vec!["Stitched 1000x3500 (3 slices)"]);
    }

    #[test]
    fn individual_summary_lists_slices() {
        let output = IndividualOutput {
            outcomes: vec![
                ImageOutcome {
                    id: "a".into(),
                    name: "cover".into(),
                    status: ImageStatus::Completed,
                    width: 1080,
                    height: 2160,
                    slices: vec![slice(0, 1200), slice(1, 960)],
                    error: None,
                },
                ImageOutcome {
                    id: "b".into(),
                    name: "broken".into(),
                    status: ImageStatus::Error,
                    width: 0,
                    height: 0,
                    slices: Vec::new(),
                    error: Some("boom".into()),
                },
            ],
        };
        let lines = format_individual_summary(&output);
        assert_eq!(
            lines,
            vec![
                "001 cover  1080x2160",
                "    000 1080x1200  1.0 KB",
                "    001 1080x960   1.0 KB",
                "002 broken  error: boom",
            ]
        );
    }

    #[test]
    fn mosaic_summary() {
        let output = MosaicOutput {
            slices: vec![slice(0, 1200)],
            composite: Some(CompositeImage {
                id: "c".into(),
                original_url: String::new(),
                width: 1080,
                height: 1200,
                size_label: "2.0 KB".into(),
            }),
        };
        assert_eq!(
            format_mosaic_summary(&output),
            vec!["Mosaic  1080x1200  2.0 KB", "    000 1080x1200  1.0 KB"]
        );
        assert_eq!(
            format_mosaic_summary(&MosaicOutput::default()),
            vec!["Mosaic: nothing to stitch"]
        );
    }

    #[test]
    fn export_summary_mentions_failures() {
        let manifest = ExportManifest {
            files: Vec::new(),
            failed: vec![FailedImage {
                image: "broken".into(),
                error: "boom".into(),
            }],
        };
        assert_eq!(
            format_export_summary(&manifest, Path::new("out")),
            vec!["Wrote 0 files to out/", "Skipped 1 failed image: broken"]
        );
    }
}
