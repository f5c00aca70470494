//! Box-fit arithmetic for derivatives.

use crate::ImageSize;

/// Largest dimensions that fit inside `box_width` x `box_height`.
///
/// The aspect ratio of the source is preserved and the result is never
/// larger than the source itself. Each axis is at least one pixel.
///
/// # Examples
///
/// ```
/// use uploadfs_core::fit_within;
///
/// assert_eq!(fit_within(1920, 1080, 800, 600), (800, 450));
/// // never upscaled
/// assert_eq!(fit_within(100, 50, 320, 320), (100, 50));
/// ```
pub fn fit_within(src_width: u32, src_height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (src_width, src_height);
    }
    let scale_w = f64::from(box_width) / f64::from(src_width);
    let scale_h = f64::from(box_height) / f64::from(src_height);
    let scale = scale_w.min(scale_h);
    if scale >= 1.0 {
        return (src_width, src_height);
    }

    let width = (f64::from(src_width) * scale).round() as u32;
    let height = (f64::from(src_height) * scale).round() as u32;
    (
        width.clamp(1, box_width.max(1)),
        height.clamp(1, box_height.max(1)),
    )
}

/// Largest bound across all sizes, computed independently per axis.
///
/// Returns `None` when `sizes` is empty.
pub fn largest_bound(sizes: &[ImageSize]) -> Option<(u32, u32)> {
    if sizes.is_empty() {
        return None;
    }
    let width = sizes.iter().map(|s| s.width).max().unwrap_or(0);
    let height = sizes.iter().map(|s| s.height).max().unwrap_or(0);
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_into_square() {
        assert_eq!(fit_within(1000, 500, 400, 400), (400, 200));
    }

    #[test]
    fn test_portrait_into_square() {
        assert_eq!(fit_within(500, 1000, 400, 400), (200, 400));
    }

    #[test]
    fn test_minimum_one_pixel() {
        assert_eq!(fit_within(10_000, 10, 100, 100), (100, 1));
    }

    #[test]
    fn test_exact_fit_is_unchanged() {
        assert_eq!(fit_within(320, 240, 320, 240), (320, 240));
    }

    #[test]
    fn test_largest_bound_is_per_axis() {
        let sizes = vec![
            ImageSize::new("wide", 1000, 100),
            ImageSize::new("tall", 100, 800),
        ];
        assert_eq!(largest_bound(&sizes), Some((1000, 800)));
        assert_eq!(largest_bound(&[]), None);
    }
}
