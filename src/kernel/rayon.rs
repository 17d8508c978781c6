//! Rayon-parallel scans (feature-gated).
//!
//! The full-range scan is split by rows; each worker scores its rows with the
//! given kernel and the per-row peaks are merged into one Top-K. Because Top-K
//! ordering is total (score, then row, then column), the result is identical
//! to the sequential scan.

use crate::candidate::topk::{Peak, TopK};
use crate::image::ImageView;
use crate::kernel::{plane_limits, Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::util::ImgFindResult;
use rayon::prelude::*;

/// Row-parallel full scan for any kernel.
pub fn scan_full_par<K: Kernel>(
    images: &[ImageView<'_, u8>],
    plans: &[TemplatePlan],
    params: ScanParams,
) -> ImgFindResult<Vec<Peak>> {
    if params.topk == 0 {
        return Ok(Vec::new());
    }
    let (max_x, max_y) = plane_limits(images, plans)?;

    let row_results: Vec<Vec<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut row_peaks = TopK::new(params.topk);
            for x in 0..=max_x {
                let score = K::score_planes(images, plans, x, y, params.min_var_i);
                if score.is_finite() && score >= params.min_score {
                    row_peaks.push(Peak { x, y, score });
                }
            }
            row_peaks.into_sorted_desc()
        })
        .collect();

    let mut topk = TopK::new(params.topk);
    for peak in row_results.into_iter().flatten() {
        topk.push(peak);
    }
    Ok(topk.into_sorted_desc())
}
