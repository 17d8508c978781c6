//! Template plan precomputation for ZNCC scoring.

use crate::image::ImageView;
use crate::util::{ImgFindError, ImgFindResult};

/// Per-pixel variance below which a template counts as flat.
pub(crate) const FLAT_VARIANCE: f64 = 1e-8;

/// Precomputed statistics and zero-mean buffer for template matching.
///
/// `t_prime = t - mean` and `var_t = sum(t_prime^2)`, so the ZNCC score at a
/// window `I` is `dot(t_prime, I) / sqrt(var_t * var_i)`. Flat templates keep
/// their mean and are scored by intensity distance instead.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    var_t: f32,
    flat: bool,
    t_prime: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> ImgFindResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(ImgFindError::InvalidDimensions { width, height })?;

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for y in 0..height {
            for &value in template_row(tpl, y)? {
                let v = value as f64;
                sum += v;
                sum_sq += v * v;
            }
        }

        let count_f = count as f64;
        let mean_f64 = sum / count_f;
        let variance = sum_sq / count_f - mean_f64 * mean_f64;
        let flat = variance <= FLAT_VARIANCE;

        let mean = mean_f64 as f32;
        let mut t_prime = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            for &value in template_row(tpl, y)? {
                let centered = value as f64 - mean_f64;
                var_t += centered * centered;
                t_prime.push(centered as f32);
            }
        }

        Ok(Self {
            width,
            height,
            mean,
            var_t: var_t as f32,
            flat,
            t_prime,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.t_prime.len()
    }

    /// Returns true if the plan covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.t_prime.is_empty()
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Returns the sum of squared deviations from the mean.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns true when the template has (near) zero variance.
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }
}

fn template_row<'a>(tpl: ImageView<'a, u8>, y: usize) -> ImgFindResult<&'a [u8]> {
    tpl.row(y).ok_or_else(|| {
        let needed = (y + 1)
            .checked_mul(tpl.stride())
            .and_then(|v| v.checked_add(tpl.width()))
            .unwrap_or(usize::MAX);
        ImgFindError::BufferTooSmall {
            needed,
            got: tpl.as_slice().len(),
        }
    })
}
