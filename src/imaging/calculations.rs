//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Edge length used for thumbnails when the request gives no dimensions.
pub const DEFAULT_THUMBNAIL_EDGE: u32 = 256;

fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    ((value as f64 * numerator as f64 / denominator as f64).round() as u32).max(1)
}

/// Target dimensions for an explicit resize.
///
/// - both sides given → exactly `(width, height)`
/// - one side given → the other follows the source aspect ratio
/// - neither → the original dimensions
///
/// ```text
/// (1600, 1200), width 800        → (800, 600)
/// (1600, 1200), height 300       → (400, 300)
/// (1600, 1200), 100 x 100        → (100, 100)
/// ```
pub fn calculate_target_dimensions(
    original: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, scale(orig_h, w, orig_w)),
        (None, Some(h)) => (scale(orig_w, h, orig_h), h),
        (None, None) => original,
    }
}

/// Dimensions that fit inside a `max_width` x `max_height` box while keeping
/// the aspect ratio. Never upscales: returns `None` when the original
/// already fits.
pub fn calculate_fit_dimensions(
    original: (u32, u32),
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    let box_w = max_width.unwrap_or(orig_w);
    let box_h = max_height.unwrap_or(orig_h);
    if orig_w <= box_w && orig_h <= box_h {
        return None;
    }
    let ratio = (box_w as f64 / orig_w as f64).min(box_h as f64 / orig_h as f64);
    Some((
        ((orig_w as f64 * ratio).round() as u32).max(1),
        ((orig_h as f64 * ratio).round() as u32).max(1),
    ))
}

/// Crop size for a thumbnail: the requested box, a square of the one given
/// side, or [`DEFAULT_THUMBNAIL_EDGE`] square.
pub fn calculate_thumbnail_dimensions(width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(edge), None) | (None, Some(edge)) => (edge, edge),
        (None, None) => (DEFAULT_THUMBNAIL_EDGE, DEFAULT_THUMBNAIL_EDGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_width_only_keeps_aspect() {
        assert_eq!(calculate_target_dimensions((1600, 1200), Some(800), None), (800, 600));
    }

    #[test]
    fn target_height_only_keeps_aspect() {
        assert_eq!(calculate_target_dimensions((1600, 1200), None, Some(300)), (400, 300));
    }

    #[test]
    fn target_both_is_exact() {
        assert_eq!(calculate_target_dimensions((1600, 1200), Some(100), Some(100)), (100, 100));
    }

    #[test]
    fn target_none_is_original() {
        assert_eq!(calculate_target_dimensions((640, 480), None, None), (640, 480));
    }

    #[test]
    fn target_never_collapses_to_zero() {
        assert_eq!(calculate_target_dimensions((4000, 10), Some(100), None), (100, 1));
    }

    #[test]
    fn fit_shrinks_to_box() {
        assert_eq!(
            calculate_fit_dimensions((2000, 1000), Some(1000), Some(1000)),
            Some((1000, 500))
        );
        assert_eq!(
            calculate_fit_dimensions((1000, 2000), Some(1000), Some(1000)),
            Some((500, 1000))
        );
    }

    #[test]
    fn fit_with_single_bound() {
        assert_eq!(calculate_fit_dimensions((1600, 1200), None, Some(600)), Some((800, 600)));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(calculate_fit_dimensions((400, 300), Some(800), Some(800)), None);
        assert_eq!(calculate_fit_dimensions((400, 300), None, None), None);
    }

    #[test]
    fn thumbnail_dimensions() {
        assert_eq!(calculate_thumbnail_dimensions(None, None), (256, 256));
        assert_eq!(calculate_thumbnail_dimensions(Some(128), None), (128, 128));
        assert_eq!(calculate_thumbnail_dimensions(None, Some(64)), (64, 64));
        assert_eq!(calculate_thumbnail_dimensions(Some(400), Some(500)), (400, 500));
    }
}
