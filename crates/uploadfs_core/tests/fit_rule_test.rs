//! Property tests for the derivative fit rule.

use proptest::prelude::*;
use uploadfs_core::fit_within;

fn dimension() -> impl Strategy<Value = u32> {
    1u32..6000
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Output never exceeds the box on either axis.
    #[test]
    fn prop_output_fits_box(
        src_w in dimension(),
        src_h in dimension(),
        box_w in dimension(),
        box_h in dimension(),
    ) {
        let (w, h) = fit_within(src_w, src_h, box_w, box_h);
        prop_assert!(w <= box_w, "width {} exceeds box {}", w, box_w);
        prop_assert!(h <= box_h, "height {} exceeds box {}", h, box_h);
        prop_assert!(w >= 1 && h >= 1);
    }

    /// Output never exceeds the source.
    #[test]
    fn prop_never_upscales(
        src_w in dimension(),
        src_h in dimension(),
        box_w in dimension(),
        box_h in dimension(),
    ) {
        let (w, h) = fit_within(src_w, src_h, box_w, box_h);
        prop_assert!(w <= src_w);
        prop_assert!(h <= src_h);
    }

    /// Aspect ratio holds within rounding tolerance.
    #[test]
    fn prop_preserves_aspect(
        src_w in dimension(),
        src_h in dimension(),
        box_w in dimension(),
        box_h in dimension(),
    ) {
        let (w, h) = fit_within(src_w, src_h, box_w, box_h);
        let skew = (u64::from(w) * u64::from(src_h)).abs_diff(u64::from(h) * u64::from(src_w));
        prop_assert!(skew <= u64::from(src_w) + u64::from(src_h), "skew {} too large", skew);
    }

    /// A source smaller than the box on both axes comes back unchanged.
    #[test]
    fn prop_small_source_unchanged(
        src_w in 1u32..500,
        src_h in 1u32..500,
        extra_w in 0u32..500,
        extra_h in 0u32..500,
    ) {
        let result = fit_within(src_w, src_h, src_w + extra_w, src_h + extra_h);
        prop_assert_eq!(result, (src_w, src_h));
    }
}

#[test]
fn test_fits_the_tighter_axis() {
    assert_eq!(fit_within(2592, 1936, 640, 640), (640, 478));
    assert_eq!(fit_within(1936, 2592, 640, 640), (478, 640));
}
