#![cfg(feature = "rayon")]

use imgfind::kernel::rayon::scan_full_par;
use imgfind::lowlevel::{Kernel, ScanParams, TemplatePlan, ZnccScalar};
use imgfind::{ImageBuffer, ImageView, MatchConfig, MatchRequest, Matcher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn make_image(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let base = ((x as f32 * 0.15).sin() + (y as f32 * 0.11).cos()) * 60.0 + 128.0;
            let jitter: f32 = rng.random_range(-20.0..20.0);
            data.push((base + jitter).clamp(0.0, 255.0) as u8);
        }
    }
    data
}

fn extract(image: &[u8], img_width: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        let start = (y0 + y) * img_width + x0;
        out.extend_from_slice(&image[start..start + w]);
    }
    out
}

#[test]
fn parallel_scan_matches_sequential() {
    let (width, height) = (96, 80);
    let image = make_image(width, height, 17);
    let tpl = extract(&image, width, 30, 22, 20, 16);
    let view = ImageView::from_slice(&image, width, height).unwrap();
    let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 20, 16).unwrap()).unwrap();
    let params = ScanParams {
        topk: 25,
        min_var_i: 1e-6,
        min_score: -1.0,
    };

    let sequential = ZnccScalar::scan_full(&[view], &[plan.clone()], params).unwrap();
    let parallel = scan_full_par::<ZnccScalar>(&[view], &[plan], params).unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!((sequential[0].x, sequential[0].y), (30, 22));
}

#[test]
fn parallel_matcher_matches_sequential() {
    let (width, height) = (160, 120);
    let image = make_image(width, height, 4);
    let tpl = extract(&image, width, 71, 38, 40, 32);

    let run = |parallel: bool| {
        let request = MatchRequest::new(
            ImageBuffer::from_gray(image.clone(), width as u32, height as u32).unwrap(),
            ImageBuffer::from_gray(tpl.clone(), 40, 32).unwrap(),
        )
        .with_limit(4);
        Matcher::new()
            .with_config(MatchConfig {
                parallel,
                ..MatchConfig::default()
            })
            .find_all(request)
            .unwrap()
    };

    let sequential = run(false);
    let parallel = run(true);
    assert_eq!(sequential, parallel);
    assert!(sequential
        .iter()
        .any(|m| (m.point.x, m.point.y) == (71.0, 38.0)));
}
