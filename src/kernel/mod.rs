//! Correlation kernel implementations.
//!
//! A kernel scores one template placement; scans over a placement range are
//! provided on top of that. The public [`zncc`] function is the raw
//! correlation primitive: two equally sized windows in, a score in `[-1, 1]`
//! out.

use crate::candidate::topk::{Peak, TopK};
use crate::image::ImageView;
use crate::template::TemplatePlan;
use crate::util::{ImgFindError, ImgFindResult};

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Default minimum window variance for ZNCC scoring.
pub const DEFAULT_MIN_VAR_I: f32 = 1e-6;

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    /// Maximum number of peaks to retain.
    pub topk: usize,
    /// Minimum variance threshold for the image window.
    pub min_var_i: f32,
    /// Minimum score threshold (discard below this value).
    pub min_score: f32,
}

/// Raw correlation sums for one channel plane at one placement.
///
/// `dot` is taken against the zero-mean template, so it already equals the
/// centred cross term; the window variance follows from `sum_i` and `sum_i2`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ZnccTerms {
    pub dot: f32,
    pub sum_i: f32,
    pub sum_i2: f32,
}

impl ZnccTerms {
    /// Sum of squared deviations of the window over `n` pixels.
    pub fn var_i(self, n: f32) -> f32 {
        self.sum_i2 - (self.sum_i * self.sum_i) / n
    }
}

/// Kernel trait for scoring and scan operations.
///
/// Implementors only accumulate [`ZnccTerms`] over one plane. Scoring pools
/// the terms of every plane, `sum(dot) / sqrt(sum(var_t) * sum(var_i))`, so a
/// colour template only scores high where all of R, G and B agree.
pub trait Kernel {
    /// Accumulates the correlation sums for one plane at `(x, y)`.
    ///
    /// Returns `None` when the template does not fit at that placement.
    fn terms_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> Option<ZnccTerms>;

    /// Computes the score of a single-plane placement (top-left coordinates).
    ///
    /// Returns `f32::NEG_INFINITY` for placements that cannot be scored.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        Self::score_planes(&[image], std::slice::from_ref(plan), x, y, min_var_i)
    }

    /// Computes the pooled score of a placement across channel planes.
    ///
    /// Templates that are flat in every plane are scored by colour distance
    /// (see [`FLAT_RMS_SCALE`]).
    fn score_planes(
        images: &[ImageView<'_, u8>],
        plans: &[TemplatePlan],
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        if images.is_empty() || images.len() != plans.len() {
            return f32::NEG_INFINITY;
        }
        if plans.iter().all(TemplatePlan::is_flat) {
            return flat_score(images, plans, x, y);
        }

        let mut dot = 0.0f32;
        let mut var_i = 0.0f32;
        let mut var_t = 0.0f32;
        for (&image, plan) in images.iter().zip(plans) {
            let Some(terms) = Self::terms_at(image, plan, x, y) else {
                return f32::NEG_INFINITY;
            };
            dot += terms.dot;
            var_i += terms.var_i(plan.len() as f32);
            var_t += plan.var_t();
        }
        if var_i <= min_var_i {
            return f32::NEG_INFINITY;
        }

        let score = dot / (var_t * var_i).sqrt();
        if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            f32::NEG_INFINITY
        }
    }

    /// Scans the full valid placement range and returns top-K peaks.
    fn scan_full(
        images: &[ImageView<'_, u8>],
        plans: &[TemplatePlan],
        params: ScanParams,
    ) -> ImgFindResult<Vec<Peak>> {
        let (max_x, max_y) = plane_limits(images, plans)?;
        Self::scan_roi(images, plans, 0, 0, max_x, max_y, params)
    }

    /// Scans an inclusive range of placement coordinates and returns top-K peaks.
    ///
    /// The range is clipped to valid placements; an empty intersection
    /// yields no peaks.
    #[allow(clippy::too_many_arguments)]
    fn scan_roi(
        images: &[ImageView<'_, u8>],
        plans: &[TemplatePlan],
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        params: ScanParams,
    ) -> ImgFindResult<Vec<Peak>> {
        if params.topk == 0 {
            return Ok(Vec::new());
        }
        let (max_x, max_y) = plane_limits(images, plans)?;
        if x0 > max_x || y0 > max_y {
            return Ok(Vec::new());
        }
        let x1 = x1.min(max_x);
        let y1 = y1.min(max_y);
        if x0 > x1 || y0 > y1 {
            return Ok(Vec::new());
        }

        let mut topk = TopK::new(params.topk);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let score = Self::score_planes(images, plans, x, y, params.min_var_i);
                if score.is_finite() && score >= params.min_score {
                    topk.push(Peak { x, y, score });
                }
            }
        }
        Ok(topk.into_sorted_desc())
    }
}

/// Returns the largest valid top-left placement `(max_x, max_y)`.
pub(crate) fn placement_limits(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> ImgFindResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    let tpl_width = plan.width();
    let tpl_height = plan.height();
    if img_width < tpl_width || img_height < tpl_height {
        return Err(ImgFindError::TemplateTooLarge {
            tpl_width,
            tpl_height,
            img_width,
            img_height,
        });
    }
    Ok((img_width - tpl_width, img_height - tpl_height))
}

/// [`placement_limits`] for matching plane sets.
pub(crate) fn plane_limits(
    images: &[ImageView<'_, u8>],
    plans: &[TemplatePlan],
) -> ImgFindResult<(usize, usize)> {
    match (images.first(), plans.first()) {
        (Some(&image), Some(plan)) if images.len() == plans.len() => {
            placement_limits(image, plan)
        }
        _ => Err(ImgFindError::ChannelMismatch {
            image: images.len(),
            template: plans.len(),
        }),
    }
}

/// Returns true if the template fits at `(x, y)`.
pub(crate) fn fits_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> bool {
    image.width() >= plan.width()
        && image.height() >= plan.height()
        && x <= image.width() - plan.width()
        && y <= image.height() - plan.height()
}

/// RMS distance (in 8-bit levels) at which a flat template scores zero.
///
/// At the default strong threshold of 0.9 a window passes only within an RMS
/// of 6.4 levels of the template colour.
pub const FLAT_RMS_SCALE: f32 = 64.0;

/// Scores a template that is flat in every plane by colour distance.
///
/// ZNCC is undefined when the template has no variance, so such templates use
/// `1 - rms / FLAT_RMS_SCALE`, with the RMS taken over all planes of the
/// window against the per-plane template means. An exact match scores 1.0
/// and the score clamps at 0.
pub(crate) fn flat_score(
    images: &[ImageView<'_, u8>],
    plans: &[TemplatePlan],
    x: usize,
    y: usize,
) -> f32 {
    let mut sse = 0.0f32;
    let mut count = 0usize;
    for (&image, plan) in images.iter().zip(plans) {
        if !fits_at(image, plan, x, y) {
            return f32::NEG_INFINITY;
        }
        let mean = plan.mean();
        for ty in 0..plan.height() {
            let Some(row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            for &value in &row[x..x + plan.width()] {
                let diff = value as f32 - mean;
                sse += diff * diff;
            }
        }
        count += plan.len();
    }
    if count == 0 {
        return f32::NEG_INFINITY;
    }
    let rms = (sse / count as f32).sqrt();
    (1.0 - rms / FLAT_RMS_SCALE).clamp(0.0, 1.0)
}

/// Normalized cross-correlation of two equally sized windows.
///
/// Returns a score in `[-1, 1]`. A flat `window_b` is compared by intensity
/// distance (see the matcher docs); a flat `window_a` against a textured
/// `window_b` has no correlation and scores 0.
pub fn zncc(window_a: ImageView<'_, u8>, window_b: ImageView<'_, u8>) -> ImgFindResult<f32> {
    if window_a.width() != window_b.width() || window_a.height() != window_b.height() {
        return Err(ImgFindError::InvalidDimensions {
            width: window_b.width(),
            height: window_b.height(),
        });
    }
    let plan = TemplatePlan::from_view(window_b)?;
    let score = crate::backend::active().score_at(window_a, &plan, 0, 0, DEFAULT_MIN_VAR_I);
    Ok(if score.is_finite() { score } else { 0.0 })
}
