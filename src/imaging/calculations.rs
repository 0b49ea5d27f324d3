//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output size of an image scaled to fit inside a bounding box.
///
/// The aspect ratio is preserved and images are never enlarged: a source that
/// already fits is returned unchanged. Neither output edge drops below 1px.
///
/// # Arguments
/// * `original` - Source image dimensions (width, height)
/// * `bounds` - Bounding box (max width, max height)
///
/// # Examples
/// ```
/// # use photo_mirror::imaging::fit_within;
/// // 1000x800 into 800x600 → height is the limiting edge
/// assert_eq!(fit_within((1000, 800), (800, 600)), (750, 600));
///
/// // Already small enough
/// assert_eq!(fit_within((640, 480), (1600, 1200)), (640, 480));
/// ```
pub fn fit_within(original: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = original;
    let (max_w, max_h) = bounds;

    if src_w <= max_w && src_h <= max_h {
        return original;
    }

    let scale_w = max_w as f64 / src_w as f64;
    let scale_h = max_h as f64 / src_h as f64;

    if scale_w <= scale_h {
        // Width is the limiting edge
        let h = (src_h as f64 * scale_w).round() as u32;
        (max_w, h.clamp(1, max_h))
    } else {
        // Height is the limiting edge
        let w = (src_w as f64 * scale_h).round() as u32;
        (w.clamp(1, max_w), max_h)
    }
}
