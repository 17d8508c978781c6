//! High-level find/match API returning logical display coordinates.

use crate::coords::{map_point, DisplayMetrics, Point};
use crate::search::{MatchConfig, MatchRequest, MatchResult, Matcher};
use crate::util::ImgFindResult;

/// Matcher bound to a display scaling context.
///
/// Results from the matcher are in native capture pixels; this facade
/// rescales them with the metrics' current [`DisplayScale`](crate::coords::DisplayScale).
pub struct Images<M> {
    matcher: Matcher,
    metrics: M,
}

impl<M: DisplayMetrics> Images<M> {
    pub fn new(metrics: M) -> Self {
        Self {
            matcher: Matcher::new(),
            metrics,
        }
    }

    pub fn with_config(metrics: M, cfg: MatchConfig) -> Self {
        Self {
            matcher: Matcher::new().with_config(cfg),
            metrics,
        }
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Top-left corner of the best match, or `None` below the strong threshold.
    pub fn find_image(&self, request: MatchRequest) -> ImgFindResult<Option<Point>> {
        let best = self.matcher.find(request)?;
        let scale = self.metrics.scale();
        Ok(best.map(|m| map_point(m.point, None, scale)))
    }

    /// Up to `limit` matches by descending score.
    pub fn match_template(&self, request: MatchRequest) -> ImgFindResult<Vec<MatchResult>> {
        let scale = self.metrics.scale();
        Ok(self
            .matcher
            .find_all(request)?
            .into_iter()
            .map(|m| MatchResult {
                point: map_point(m.point, None, scale),
                score: m.score,
            })
            .collect())
    }
}
