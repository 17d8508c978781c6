//! Scalar reference kernel for ZNCC scoring.

use crate::image::ImageView;
use crate::kernel::{fits_at, Kernel, ZnccTerms};
use crate::template::TemplatePlan;

/// Scalar ZNCC kernel.
pub struct ZnccScalar;

impl Kernel for ZnccScalar {
    fn terms_at(
        image: ImageView<'_, u8>,
        tpl: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> Option<ZnccTerms> {
        if !fits_at(image, tpl, x, y) {
            return None;
        }

        let tpl_width = tpl.width();
        let t_prime = tpl.t_prime();
        let mut terms = ZnccTerms::default();
        for ty in 0..tpl.height() {
            let img_row = image.row(y + ty)?;
            let base = ty * tpl_width;
            let window = &img_row[x..x + tpl_width];
            for (&t, &value) in t_prime[base..base + tpl_width].iter().zip(window) {
                let value = value as f32;
                terms.dot += t * value;
                terms.sum_i += value;
                terms.sum_i2 += value * value;
            }
        }
        Some(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccScalar;
    use crate::image::ImageView;
    use crate::kernel::{Kernel, ScanParams};
    use crate::template::TemplatePlan;

    #[test]
    fn scan_matches_bruteforce() {
        let img_width = 6;
        let img_height = 5;
        let mut image = Vec::with_capacity(img_width * img_height);
        for y in 0..img_height {
            for x in 0..img_width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        let tpl_width = 3;
        let tpl_height = 2;
        let mut tpl = Vec::with_capacity(tpl_width * tpl_height);
        for y in 0..tpl_height {
            for x in 0..tpl_width {
                tpl.push(((x * 5 + y * 11 + x * y) & 0xFF) as u8);
            }
        }

        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let tpl_view = ImageView::from_slice(&tpl, tpl_width, tpl_height).unwrap();
        let plan = TemplatePlan::from_view(tpl_view).unwrap();

        let params = ScanParams {
            topk: 1,
            min_var_i: 1e-8,
            min_score: f32::NEG_INFINITY,
        };
        let best = ZnccScalar::scan_full(&[image_view], &[plan], params)
            .unwrap()
            .pop()
            .unwrap();

        let n = (tpl_width * tpl_height) as f64;
        let tpl_mean = tpl.iter().map(|&v| v as f64).sum::<f64>() / n;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_xy = (0, 0);
        for y in 0..=(img_height - tpl_height) {
            for x in 0..=(img_width - tpl_width) {
                let mut window = Vec::new();
                for ty in 0..tpl_height {
                    let row = image_view.row(y + ty).unwrap();
                    window.extend(row[x..x + tpl_width].iter().map(|&v| v as f64));
                }
                let win_mean = window.iter().sum::<f64>() / n;
                let mut num = 0.0;
                let mut den_t = 0.0;
                let mut den_i = 0.0;
                for (i, &w) in window.iter().enumerate() {
                    let t = tpl[i] as f64 - tpl_mean;
                    let v = w - win_mean;
                    num += t * v;
                    den_t += t * t;
                    den_i += v * v;
                }
                if den_i <= 1e-8 {
                    continue;
                }
                let score = num / (den_t * den_i).sqrt();
                if score > best_score {
                    best_score = score;
                    best_xy = (x, y);
                }
            }
        }

        assert_eq!((best.x, best.y), best_xy);
        assert!((best.score - best_score as f32).abs() < 1e-4);
    }

    #[test]
    fn exact_copy_scores_one() {
        let data: Vec<u8> = (0..64).map(|i| ((i * 37) % 251) as u8).collect();
        let view = ImageView::from_slice(&data, 8, 8).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        let score = ZnccScalar::score_at(view, &plan, 0, 0, 1e-6);
        assert!((score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn flat_template_uses_intensity_distance() {
        let mut image = vec![200u8; 8 * 4];
        for y in 1..3 {
            for x in 4..6 {
                image[y * 8 + x] = 50;
            }
        }
        let image_view = ImageView::from_slice(&image, 8, 4).unwrap();
        let tpl = [50u8; 4];
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        assert!(plan.is_flat());

        let exact = ZnccScalar::score_at(image_view, &plan, 4, 1, 1e-6);
        let miss = ZnccScalar::score_at(image_view, &plan, 0, 0, 1e-6);
        assert!((exact - 1.0).abs() < 1e-6);
        assert!(miss < 0.5);
    }

    #[test]
    fn flat_window_is_skipped_for_textured_template() {
        let image = [9u8; 16];
        let tpl = [0u8, 10, 20, 30];
        let image_view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        assert_eq!(
            ZnccScalar::score_at(image_view, &plan, 1, 1, 1e-6),
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn textured_window_sharing_the_flat_mean_is_rejected() {
        // Alternating 100/150 has mean 125 and an RMS of 25 around it.
        let image: Vec<u8> = (0..16).map(|i| if i % 2 == 0 { 100 } else { 150 }).collect();
        let tpl = [125u8; 16];
        let image_view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 4, 4).unwrap()).unwrap();
        let score = ZnccScalar::score_at(image_view, &plan, 0, 0, 1e-6);
        assert!(score < 0.7, "{score}");
    }

    #[test]
    fn pooled_score_needs_every_plane_to_agree() {
        let red: Vec<u8> = (0..16).map(|i| (i * 13) as u8).collect();
        let green: Vec<u8> = (0..16).map(|i| (200 - i * 11) as u8).collect();
        let green_flipped: Vec<u8> = green.iter().rev().copied().collect();
        let plans = [
            TemplatePlan::from_view(ImageView::from_slice(&red, 4, 4).unwrap()).unwrap(),
            TemplatePlan::from_view(ImageView::from_slice(&green, 4, 4).unwrap()).unwrap(),
        ];

        let same = [
            ImageView::from_slice(&red, 4, 4).unwrap(),
            ImageView::from_slice(&green, 4, 4).unwrap(),
        ];
        let mixed = [
            ImageView::from_slice(&red, 4, 4).unwrap(),
            ImageView::from_slice(&green_flipped, 4, 4).unwrap(),
        ];
        let exact = ZnccScalar::score_planes(&same, &plans, 0, 0, 1e-6);
        let partial = ZnccScalar::score_planes(&mixed, &plans, 0, 0, 1e-6);
        assert!((exact - 1.0).abs() < 1e-4);
        assert!(partial < 0.5, "{partial}");
        assert_eq!(
            ZnccScalar::score_planes(&same[..1], &plans, 0, 0, 1e-6),
            f32::NEG_INFINITY
        );
    }
}
