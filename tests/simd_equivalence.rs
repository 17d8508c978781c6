#![cfg(feature = "simd")]

use imgfind::lowlevel::{Kernel, ScanParams, TemplatePlan, ZnccScalar, ZnccSimd};
use imgfind::{Backend, ImageView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn simd_scan_agrees_with_scalar() {
    let mut rng = StdRng::seed_from_u64(99);
    let (width, height) = (73, 51);
    let image: Vec<u8> = (0..width * height).map(|_| rng.random_range(0..=255)).collect();
    let view = ImageView::from_slice(&image, width, height).unwrap();
    // Width 19 exercises both the 8-lane body and the scalar tail.
    let tpl = view.roi(40, 12, 19, 14).unwrap();
    let plan = TemplatePlan::from_view(tpl).unwrap();
    let params = ScanParams {
        topk: 5,
        min_var_i: 1e-6,
        min_score: -1.0,
    };

    let plans = [plan];
    let scalar = ZnccScalar::scan_full(&[view], &plans, params).unwrap();
    let simd = ZnccSimd::scan_full(&[view], &plans, params).unwrap();
    assert_eq!((simd[0].x, simd[0].y), (40, 12));
    assert_eq!((scalar[0].x, scalar[0].y), (40, 12));
    for peak in &scalar {
        let score = ZnccSimd::score_at(view, &plans[0], peak.x, peak.y, 1e-6);
        assert!((peak.score - score).abs() < 1e-3, "({}, {})", peak.x, peak.y);
    }
}

#[test]
fn simd_backend_is_selected() {
    assert_eq!(imgfind::backend::active(), Backend::Simd);
}

#[test]
fn simd_pooled_planes_agree_with_scalar() {
    let mut rng = StdRng::seed_from_u64(5);
    let (width, height) = (48, 32);
    let planes: Vec<Vec<u8>> = (0..3)
        .map(|_| (0..width * height).map(|_| rng.random_range(0..=255)).collect())
        .collect();
    let views: Vec<ImageView<'_, u8>> = planes
        .iter()
        .map(|p| ImageView::from_slice(p, width, height).unwrap())
        .collect();
    let plans: Vec<TemplatePlan> = views
        .iter()
        .map(|v| TemplatePlan::from_view(v.roi(9, 6, 21, 13).unwrap()).unwrap())
        .collect();

    for (x, y) in [(0, 0), (9, 6), (20, 11), (27, 19)] {
        let scalar = ZnccScalar::score_planes(&views, &plans, x, y, 1e-6);
        let simd = ZnccSimd::score_planes(&views, &plans, x, y, 1e-6);
        assert!((scalar - simd).abs() < 1e-3, "({x}, {y}): {scalar} vs {simd}");
    }
    assert!((ZnccSimd::score_planes(&views, &plans, 9, 6, 1e-6) - 1.0).abs() < 1e-4);
}
