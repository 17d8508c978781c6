//! SIMD-accelerated ZNCC kernel using the `wide` crate.
//!
//! The inner template row loop is vectorized to process 8 pixels at a time
//! using `f32x8`; row tails fall back to scalar accumulation.

use crate::image::ImageView;
use crate::kernel::{fits_at, Kernel, ZnccTerms};
use crate::template::TemplatePlan;
use wide::f32x8;

const LANES: usize = 8;

/// Load 8 u8 values and convert to f32x8.
#[inline]
fn load_u8x8_as_f32x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        slice[0] as f32,
        slice[1] as f32,
        slice[2] as f32,
        slice[3] as f32,
        slice[4] as f32,
        slice[5] as f32,
        slice[6] as f32,
        slice[7] as f32,
    ])
}

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    v.to_array().iter().sum()
}

/// SIMD ZNCC kernel.
pub struct ZnccSimd;

impl Kernel for ZnccSimd {
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
        let simd_end = tpl_width / LANES * LANES;

        let mut dot_vec = f32x8::ZERO;
        let mut sum_i_vec = f32x8::ZERO;
        let mut sum_i2_vec = f32x8::ZERO;
        let mut tail = ZnccTerms::default();

        for ty in 0..tpl.height() {
            let img_row = image.row(y + ty)?;
            let base = ty * tpl_width;

            let mut tx = 0;
            while tx < simd_end {
                let img_vals = load_u8x8_as_f32x8(&img_row[x + tx..]);
                let tpl_vals = load_f32x8(&t_prime[base + tx..]);
                dot_vec += tpl_vals * img_vals;
                sum_i_vec += img_vals;
                sum_i2_vec += img_vals * img_vals;
                tx += LANES;
            }

            while tx < tpl_width {
                let value = img_row[x + tx] as f32;
                tail.dot += t_prime[base + tx] * value;
                tail.sum_i += value;
                tail.sum_i2 += value * value;
                tx += 1;
            }
        }

        Some(ZnccTerms {
            dot: hsum(dot_vec) + tail.dot,
            sum_i: hsum(sum_i_vec) + tail.sum_i,
            sum_i2: hsum(sum_i2_vec) + tail.sum_i2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccSimd;
    use crate::image::ImageView;
    use crate::kernel::scalar::ZnccScalar;
    use crate::kernel::Kernel;
    use crate::template::TemplatePlan;

    #[test]
    fn simd_matches_scalar_scores() {
        let width = 40;
        let height = 30;
        let image: Vec<u8> = (0..width * height)
            .map(|i| (((i % width) * 7 + (i / width) * 13 + i % 5) & 0xFF) as u8)
            .collect();
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let tpl = view.roi(5, 4, 19, 11).unwrap();
        let plan = TemplatePlan::from_view(tpl).unwrap();

        for (x, y) in [(0, 0), (5, 4), (12, 9), (21, 19)] {
            let scalar = ZnccScalar::score_at(view, &plan, x, y, 1e-6);
            let simd = ZnccSimd::score_at(view, &plan, x, y, 1e-6);
            assert!((scalar - simd).abs() < 1e-3, "({x}, {y}): {scalar} vs {simd}");
        }
    }
}
