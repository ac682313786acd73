//! Pure calculation functions for image dimensions and band layout.
//!
//! All functions here are pure and testable without any I/O or images.

/// Height of a source scaled to `target_width`, rounded to whole pixels.
///
/// Rounding matters: fractional heights blur the seams between stacked
/// sources. A zero-width source scales to nothing.
///
/// ```
/// # use longstrip::imaging::scaled_height;
/// // 800x1600 scaled to width 1000 → 2000
/// assert_eq!(scaled_height((800, 1600), 1000), 2000);
/// ```
pub fn scaled_height(source: (u32, u32), target_width: u32) -> u32 {
    let (src_w, src_h) = source;
    if src_w == 0 {
        return 0;
    }
    (src_h as f64 * target_width as f64 / src_w as f64).round() as u32
}

/// One horizontal band of a surface: rows `[y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub y: u32,
    pub height: u32,
}

/// Partition `[0, total_height)` into consecutive bands no taller than
/// `slice_height`.
///
/// The last band may be shorter. A zero `slice_height` or `total_height`
/// yields no bands.
pub fn band_layout(total_height: u32, slice_height: u32) -> Vec<Band> {
    if slice_height == 0 {
        return Vec::new();
    }
    let mut bands = Vec::with_capacity(slice_count(total_height, slice_height));
    let mut y = 0;
    while y < total_height {
        let height = slice_height.min(total_height - y);
        bands.push(Band { y, height });
        y += height;
    }
    bands
}

/// Number of bands [`band_layout`] produces: `ceil(total / slice)`.
pub fn slice_count(total_height: u32, slice_height: u32) -> usize {
    if slice_height == 0 {
        return 0;
    }
    total_height.div_ceil(slice_height) as usize
}

/// Vertical slot of each source inside a stitched canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchSlot {
    pub y: u32,
    pub height: u32,
}

/// Lay out sources top to bottom at `target_width`, preserving order.
///
/// Returns one slot per source (zero-height for sources that scale to
/// nothing) and the total canvas height.
pub fn stitch_layout(sources: &[(u32, u32)], target_width: u32) -> (Vec<StitchSlot>, u32) {
    let mut slots = Vec::with_capacity(sources.len());
    let mut y = 0u32;
    for &dims in sources {
        let height = scaled_height(dims, target_width);
        slots.push(StitchSlot { y, height });
        y = y.saturating_add(height);
    }
    (slots, y)
}
