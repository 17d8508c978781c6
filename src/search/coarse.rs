//! Exhaustive search at the coarsest pyramid level.

use crate::backend::Backend;
use crate::candidate::nms::nms_2d;
use crate::candidate::topk::Peak;
use crate::image::pyramid::PlanarPyramid;
use crate::kernel::{plane_limits, ScanParams};
use crate::search::{MatchConfig, SearchParams};
use crate::template::CompiledTemplate;
use crate::trace::{trace_event, trace_span};
use crate::util::{ImgFindError, ImgFindResult};

/// Scans every placement at `level` and returns suppressed candidates.
///
/// Every placement at or above the weak threshold enters non-maximum
/// suppression with half-template radii. Survivors are capped at
/// `max_candidates`, but never below the request's `limit`.
pub(crate) fn coarse_search(
    backend: Backend,
    pyramid: &PlanarPyramid,
    compiled: &CompiledTemplate,
    level: usize,
    params: SearchParams,
    cfg: &MatchConfig,
) -> ImgFindResult<Vec<Peak>> {
    let images = pyramid
        .level(level)
        .ok_or_else(|| missing_level(level, pyramid.len()))?;
    let plans = compiled
        .plans(level)
        .ok_or_else(|| missing_level(level, compiled.num_levels()))?;
    let (max_x, max_y) = plane_limits(&images, plans)?;
    let (tpl_width, tpl_height) = (plans[0].width(), plans[0].height());

    let _span = trace_span!(
        "coarse_search",
        level = level,
        planes = images.len(),
        width = images[0].width(),
        height = images[0].height(),
        parallel = cfg.parallel
    )
    .entered();

    let placements = (max_x + 1).saturating_mul(max_y + 1);
    let scan = ScanParams {
        topk: placements,
        min_var_i: cfg.min_var_i,
        min_score: params.weak_threshold,
    };
    let mut peaks = backend.scan_full(&images, plans, scan, cfg.parallel)?;
    if peaks.is_empty() {
        trace_event!(debug: "coarse_candidates", count = 0usize);
        return Ok(peaks);
    }

    let mut kept = nms_2d(&mut peaks, tpl_width / 2, tpl_height / 2);
    kept.truncate(cfg.max_candidates.max(params.limit));
    trace_event!(debug: "coarse_candidates", above_weak = peaks.len(), count = kept.len());
    Ok(kept)
}

pub(crate) fn missing_level(level: usize, len: usize) -> ImgFindError {
    ImgFindError::IndexOutOfBounds {
        index: level,
        len,
        context: "level",
    }
}
