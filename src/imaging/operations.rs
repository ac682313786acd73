//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they compute
//! the layout, allocate the background-filled surface, and draw through the
//! backend.

use super::backend::{BackendError, ImageBackend, Surface};
use super::calculations::stitch_layout;
use super::params::ExportFormat;
use image::{DynamicImage, GenericImageView};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Resize one source to exactly `width × height`.
///
/// The surface is allocated first (white when `format` is JPEG) and the
/// source is drawn over it with Lanczos3, so transparent regions composite
/// the same way here as in every later slice.
pub fn resize_image(
    backend: &impl ImageBackend,
    source: &DynamicImage,
    width: u32,
    height: u32,
    format: ExportFormat,
) -> Result<Surface> {
    let mut surface = backend.allocate(width, height, format)?;
    backend.draw_scaled(&mut surface, source, 0, width, height)?;
    Ok(surface)
}

/// Stack `sources` top to bottom, each scaled to `target_width`.
///
/// Each source keeps its aspect ratio with its height rounded to whole
/// pixels; order is preserved exactly. An empty list yields a zero-height
/// canvas.
pub fn stitch_images(
    backend: &impl ImageBackend,
    sources: &[&DynamicImage],
    target_width: u32,
    format: ExportFormat,
) -> Result<Surface> {
    let dims: Vec<(u32, u32)> = sources.iter().map(|s| s.dimensions()).collect();
    let (slots, total_height) = stitch_layout(&dims, target_width);

    let mut canvas = backend.allocate(target_width, total_height, format)?;
    for (source, slot) in sources.iter().zip(&slots) {
        if slot.height == 0 {
            continue;
        }
        backend.draw_scaled(&mut canvas, source, slot.y, target_width, slot.height)?;
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::{Rgba, RgbaImage};

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn resize_allocates_exact_target() {
        let backend = MockBackend::new();
        let surface = resize_image(
            &backend,
            &solid(20, 40, [0, 0, 0, 255]),
            10,
            7,
            ExportFormat::Jpeg,
        )
        .unwrap();
        assert_eq!((surface.width(), surface.height()), (10, 7));

        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![
                RecordedOp::Allocate {
                    width: 10,
                    height: 7,
                    format: ExportFormat::Jpeg
                },
                RecordedOp::DrawScaled {
                    y: 0,
                    width: 10,
                    height: 7
                },
            ]
        );
    }

    #[test]
    fn resize_surface_failure_propagates() {
        let backend = MockBackend::with_max_pixels(10);
        let result = resize_image(
            &backend,
            &solid(4, 4, [0, 0, 0, 255]),
            100,
            100,
            ExportFormat::Png,
        );
        assert!(matches!(
            result,
            Err(BackendError::SurfaceUnavailable { .. })
        ));
    }

    #[test]
    fn stitch_draws_each_source_at_cumulative_offset() {
        let backend = MockBackend::new();
        let first = solid(800, 1600, [255, 0, 0, 255]);
        let second = solid(1200, 1800, [0, 0, 255, 255]);

        let canvas =
            stitch_images(&backend, &[&first, &second], 1000, ExportFormat::Jpeg).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (1000, 3500));

        let draws: Vec<RecordedOp> = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::DrawScaled { .. }))
            .collect();
        assert_eq!(
            draws,
            vec![
                RecordedOp::DrawScaled {
                    y: 0,
                    width: 1000,
                    height: 2000
                },
                RecordedOp::DrawScaled {
                    y: 2000,
                    width: 1000,
                    height: 1500
                },
            ]
        );
    }

    #[test]
    fn stitch_empty_list_is_zero_height() {
        let backend = MockBackend::new();
        let canvas = stitch_images(&backend, &[], 1000, ExportFormat::Png).unwrap();
        assert_eq!(canvas.height(), 0);
        assert_eq!(canvas.width(), 1000);
    }

    #[test]
    fn stitch_skips_zero_width_sources() {
        let backend = MockBackend::new();
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        let real = solid(10, 20, [0, 0, 0, 255]);
        let canvas = stitch_images(&backend, &[&empty, &real], 5, ExportFormat::Png).unwrap();
        assert_eq!(canvas.height(), 10);
        let draws = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::DrawScaled { .. }))
            .count();
        assert_eq!(draws, 1);
    }

    #[test]
    fn stitch_preserves_order_in_pixels() {
        let backend = RustBackend::new();
        let red = solid(10, 10, [255, 0, 0, 255]);
        let blue = solid(20, 10, [0, 0, 255, 255]);

        let canvas = stitch_images(&backend, &[&red, &blue], 10, ExportFormat::Png).unwrap();
        // red → 10x10, blue → 10x5
        assert_eq!(canvas.height(), 15);
        assert_eq!(*canvas.pixels().get_pixel(5, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.pixels().get_pixel(5, 13), Rgba([0, 0, 255, 255]));
    }
}
