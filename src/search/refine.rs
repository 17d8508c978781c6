//! Refinement of candidates one pyramid level at a time.
//!
//! A candidate at level `l + 1` maps to `(2x, 2y)` at level `l`. The
//! kernel re-scores every placement within `refine_radius` of that point and
//! keeps the best one. Intermediate levels gate on the weak threshold, level
//! 0 on the strong threshold.

use crate::backend::Backend;
use crate::candidate::nms::nms_2d;
use crate::candidate::topk::Peak;
use crate::image::pyramid::PlanarPyramid;
use crate::kernel::{plane_limits, ScanParams};
use crate::search::coarse::missing_level;
use crate::search::{MatchConfig, SearchParams};
use crate::template::CompiledTemplate;
use crate::trace::{trace_event, trace_span};
use crate::util::ImgFindResult;

fn upscale_pos(x: usize, y: usize) -> (usize, usize) {
    (x.saturating_mul(2), y.saturating_mul(2))
}

fn roi_bounds(
    x: usize,
    y: usize,
    radius: usize,
    max_x: usize,
    max_y: usize,
) -> Option<(usize, usize, usize, usize)> {
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    if x0 > max_x || y0 > max_y {
        return None;
    }
    let x1 = x.saturating_add(radius).min(max_x);
    let y1 = y.saturating_add(radius).min(max_y);
    Some((x0, y0, x1, y1))
}

/// Moves `prev` (candidates at `level + 1`) down to `level`.
pub(crate) fn refine_level(
    backend: Backend,
    pyramid: &PlanarPyramid,
    compiled: &CompiledTemplate,
    level: usize,
    prev: &[Peak],
    params: SearchParams,
    cfg: &MatchConfig,
) -> ImgFindResult<Vec<Peak>> {
    let images = pyramid
        .level(level)
        .ok_or_else(|| missing_level(level, pyramid.len()))?;
    let plans = compiled
        .plans(level)
        .ok_or_else(|| missing_level(level, compiled.num_levels()))?;

    let _span = trace_span!("refine_level", level = level, candidates = prev.len()).entered();

    let (max_x, max_y) = plane_limits(&images, plans)?;
    let min_score = if level == 0 {
        params.strong_threshold
    } else {
        params.weak_threshold
    };
    let scan = ScanParams {
        topk: 1,
        min_var_i: cfg.min_var_i,
        min_score,
    };

    let mut refined = Vec::with_capacity(prev.len());
    for cand in prev {
        let (x_up, y_up) = upscale_pos(cand.x, cand.y);
        let Some((x0, y0, x1, y1)) = roi_bounds(x_up, y_up, cfg.refine_radius, max_x, max_y)
        else {
            continue;
        };
        refined.extend(backend.scan_roi(&images, plans, x0, y0, x1, y1, scan)?);
    }

    let kept = nms_2d(&mut refined, plans[0].width() / 2, plans[0].height() / 2);
    trace_event!(debug: "refined_candidates", level = level, count = kept.len());
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::roi_bounds;

    #[test]
    fn roi_bounds_clip_to_valid_placements() {
        assert_eq!(roi_bounds(0, 0, 2, 10, 10), Some((0, 0, 2, 2)));
        assert_eq!(roi_bounds(9, 10, 2, 10, 10), Some((7, 8, 10, 10)));
        assert_eq!(roi_bounds(14, 4, 2, 10, 10), None);
    }
}
