//! Non-maximum suppression for overlapping candidates.

use crate::candidate::topk::{sort_peaks_desc, Peak};

/// Applies 2D non-maximum suppression with separate radii per axis.
///
/// Peaks are sorted by descending score and kept unless some previously kept
/// peak lies within `radius_x` columns and `radius_y` rows of it. With
/// template-sized windows this drops candidates whose boxes overlap heavily.
pub fn nms_2d(peaks: &mut [Peak], radius_x: usize, radius_y: usize) -> Vec<Peak> {
    sort_peaks_desc(peaks);
    if radius_x == 0 && radius_y == 0 {
        return peaks.to_owned();
    }

    let mut kept: Vec<Peak> = Vec::new();
    'outer: for peak in peaks.iter().copied() {
        for kept_peak in kept.iter() {
            let dx = peak.x.abs_diff(kept_peak.x);
            let dy = peak.y.abs_diff(kept_peak.y);
            if dx <= radius_x && dy <= radius_y {
                continue 'outer;
            }
        }
        kept.push(peak);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::nms_2d;
    use crate::candidate::topk::Peak;

    #[test]
    fn nms_keeps_strongest_of_cluster() {
        let mut peaks = vec![
            Peak { x: 10, y: 10, score: 0.8 },
            Peak { x: 11, y: 10, score: 0.95 },
            Peak { x: 40, y: 10, score: 0.9 },
            Peak { x: 12, y: 11, score: 0.7 },
        ];
        let kept = nms_2d(&mut peaks, 4, 4);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].x, kept[0].y), (11, 10));
        assert_eq!((kept[1].x, kept[1].y), (40, 10));
    }

    #[test]
    fn nms_radius_is_per_axis() {
        let mut peaks = vec![
            Peak { x: 0, y: 0, score: 0.9 },
            Peak { x: 3, y: 8, score: 0.8 },
        ];
        assert_eq!(nms_2d(&mut peaks.clone(), 4, 8).len(), 1);
        assert_eq!(nms_2d(&mut peaks, 4, 7).len(), 2);
    }
}
