//! Coarse-to-fine template search.
//!
//! The matcher builds 2x box-filter pyramids for the source and template,
//! scans the coarsest level exhaustively with the weak threshold, then walks
//! each surviving candidate down the pyramid, re-scoring it in a small window
//! around its upsampled position. Level 0 applies the strong threshold.
//! Colour inputs are searched on R, G and B planes at once, with the
//! correlation sums pooled across planes.

pub(crate) mod coarse;
pub(crate) mod refine;

use crate::candidate::nms::nms_2d;
use crate::candidate::topk::Peak;
use crate::coords::{map_point, DisplayScale, Point};
use crate::image::pyramid::{OwnedImage, PlanarPyramid};
use crate::image::{ImageBuffer, ImageView, PixelFormat, Region};
use crate::kernel::DEFAULT_MIN_VAR_I;
use crate::template::CompiledTemplate;
use crate::trace::{trace_event, trace_span};
use crate::util::math::check_unit_interval;
use crate::util::{ImgFindError, ImgFindResult};

/// Shortest template side (in pixels) that `MaxLevel::Auto` keeps per level.
pub const MIN_TEMPLATE_SIDE: usize = 8;
/// Deepest pyramid level `MaxLevel::Auto` will choose.
pub const MAX_AUTO_LEVEL: usize = 6;

/// Default coarse-level acceptance threshold.
pub const DEFAULT_WEAK_THRESHOLD: f32 = 0.7;
/// Default final acceptance threshold.
pub const DEFAULT_STRONG_THRESHOLD: f32 = 0.9;

/// Deepest pyramid level used by a search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaxLevel {
    /// Deepest level at which the template's shorter side stays at least
    /// [`MIN_TEMPLATE_SIDE`] pixels, capped at [`MAX_AUTO_LEVEL`].
    #[default]
    Auto,
    /// Explicit level index (0 searches the base resolution only). Clamped to
    /// the deepest level both pyramids can reach.
    Fixed(usize),
}

impl MaxLevel {
    /// Resolves to a concrete level index for a template size.
    pub fn resolve(self, tpl_width: usize, tpl_height: usize) -> usize {
        match self {
            MaxLevel::Fixed(level) => level,
            MaxLevel::Auto => {
                let mut side = tpl_width.min(tpl_height);
                let mut level = 0;
                while level < MAX_AUTO_LEVEL && side / 2 >= MIN_TEMPLATE_SIDE {
                    side /= 2;
                    level += 1;
                }
                level
            }
        }
    }
}

/// Matcher tuning knobs shared by every request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    /// Half-size of the refinement window at each finer level.
    pub refine_radius: usize,
    /// Candidates carried down the pyramid after suppression. A request
    /// whose `limit` is larger carries `limit` candidates instead.
    pub max_candidates: usize,
    /// Minimum window variance for ZNCC scoring.
    pub min_var_i: f32,
    /// Row-parallel coarse scan (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            refine_radius: 2,
            max_candidates: 64,
            min_var_i: DEFAULT_MIN_VAR_I,
            parallel: false,
        }
    }
}

/// Thresholds and limits for one search over plane views.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchParams {
    /// Coarse and intermediate acceptance threshold.
    pub weak_threshold: f32,
    /// Final (level 0) acceptance threshold.
    pub strong_threshold: f32,
    /// Deepest pyramid level.
    pub max_level: MaxLevel,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            weak_threshold: DEFAULT_WEAK_THRESHOLD,
            strong_threshold: DEFAULT_STRONG_THRESHOLD,
            max_level: MaxLevel::Auto,
            limit: 1,
        }
    }
}

impl SearchParams {
    fn validated(self) -> ImgFindResult<Self> {
        check_unit_interval("weak_threshold", self.weak_threshold)?;
        check_unit_interval("strong_threshold", self.strong_threshold)?;
        Ok(self)
    }
}

/// A request to find a template inside a source image.
///
/// Both buffers are consumed by the search, whether or not it succeeds.
#[derive(Debug)]
pub struct MatchRequest {
    pub source: ImageBuffer,
    pub template: ImageBuffer,
    pub weak_threshold: f32,
    pub strong_threshold: f32,
    /// Region of the source to search; its far edges are clipped.
    pub region: Option<Region>,
    pub max_level: MaxLevel,
    pub limit: usize,
}

impl MatchRequest {
    /// Creates a request with default thresholds, no region and limit 1.
    pub fn new(source: ImageBuffer, template: ImageBuffer) -> Self {
        let defaults = SearchParams::default();
        Self {
            source,
            template,
            weak_threshold: defaults.weak_threshold,
            strong_threshold: defaults.strong_threshold,
            region: None,
            max_level: defaults.max_level,
            limit: defaults.limit,
        }
    }

    /// Sets the weak and strong thresholds.
    pub fn with_thresholds(mut self, weak: f32, strong: f32) -> Self {
        self.weak_threshold = weak;
        self.strong_threshold = strong;
        self
    }

    /// Restricts the search to a region of the source.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Sets the deepest pyramid level.
    pub fn with_max_level(mut self, max_level: MaxLevel) -> Self {
        self.max_level = max_level;
        self
    }

    /// Sets the maximum number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn params(&self) -> SearchParams {
        SearchParams {
            weak_threshold: self.weak_threshold,
            strong_threshold: self.strong_threshold,
            max_level: self.max_level,
            limit: self.limit,
        }
    }
}

/// A match in source image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Top-left corner of the matched region.
    pub point: Point,
    /// ZNCC score (or intensity similarity for flat templates).
    pub score: f32,
}

/// Coarse-to-fine template matcher.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the matcher configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Returns the best match clearing the strong threshold, if any.
    ///
    /// The request's limit is ignored.
    pub fn find(&self, request: MatchRequest) -> ImgFindResult<Option<MatchResult>> {
        let mut results = self.find_all(request.with_limit(1))?;
        Ok(results.pop())
    }

    /// Returns up to `limit` non-overlapping matches by descending score.
    ///
    /// Two RGBA buffers are matched on their R, G and B planes; if either
    /// buffer is grayscale both are matched on luminance.
    pub fn find_all(&self, request: MatchRequest) -> ImgFindResult<Vec<MatchResult>> {
        let params = request.params().validated()?;
        let region = request.region;
        let color = request.source.format() == PixelFormat::Rgba8
            && request.template.format() == PixelFormat::Rgba8;
        let source = request.source.to_planes("find_image", "source", color)?;
        let template = request.template.to_planes("find_image", "template", color)?;

        let mut images: Vec<ImageView<'_, u8>> = source.iter().map(OwnedImage::view).collect();
        let templates: Vec<ImageView<'_, u8>> = template.iter().map(OwnedImage::view).collect();
        let offset = match region {
            Some(region) => {
                for image in images.iter_mut() {
                    *image = image.clipped_roi(region)?;
                }
                Some((region.x, region.y))
            }
            None => None,
        };

        let peaks = self.match_planes(&images, &templates, params)?;
        Ok(peaks
            .into_iter()
            .map(|peak| MatchResult {
                point: map_point(
                    Point::new(peak.x as f64, peak.y as f64),
                    offset,
                    DisplayScale::IDENTITY,
                ),
                score: peak.score,
            })
            .collect())
    }

    /// Searches a grayscale view for a grayscale template.
    ///
    /// Returned peaks are top-left corners in `image` coordinates, ordered by
    /// descending score with `(y, x)` tie-breaking.
    pub fn match_view(
        &self,
        image: ImageView<'_, u8>,
        template: ImageView<'_, u8>,
        params: SearchParams,
    ) -> ImgFindResult<Vec<Peak>> {
        self.match_planes(&[image], &[template], params)
    }

    /// Searches matching sets of channel planes (for example R, G and B).
    ///
    /// `images` and `templates` must hold the same number of planes, and the
    /// planes within each set must share one size.
    pub fn match_planes(
        &self,
        images: &[ImageView<'_, u8>],
        templates: &[ImageView<'_, u8>],
        params: SearchParams,
    ) -> ImgFindResult<Vec<Peak>> {
        let params = params.validated()?;
        let (Some(image), Some(template)) = (images.first(), templates.first()) else {
            return Err(ImgFindError::ChannelMismatch {
                image: images.len(),
                template: templates.len(),
            });
        };
        if images.len() != templates.len() {
            return Err(ImgFindError::ChannelMismatch {
                image: images.len(),
                template: templates.len(),
            });
        }
        let (tpl_width, tpl_height) = (template.width(), template.height());
        let _span = trace_span!(
            "find_image",
            img_width = image.width(),
            img_height = image.height(),
            tpl_width = tpl_width,
            tpl_height = tpl_height,
            planes = images.len()
        )
        .entered();

        if tpl_width > image.width() || tpl_height > image.height() {
            return Err(ImgFindError::TemplateTooLarge {
                tpl_width,
                tpl_height,
                img_width: image.width(),
                img_height: image.height(),
            });
        }
        if params.limit == 0 {
            return Ok(Vec::new());
        }

        let deepest = tpl_width.min(tpl_height).ilog2() as usize;
        let max_level = params.max_level.resolve(tpl_width, tpl_height).min(deepest);
        let compiled = CompiledTemplate::compile_planes(templates, max_level + 1)?;
        let pyramid = PlanarPyramid::build(images, compiled.num_levels())?;
        let coarsest = compiled.num_levels().min(pyramid.len()) - 1;

        let backend = crate::backend::active();
        let mut candidates =
            coarse::coarse_search(backend, &pyramid, &compiled, coarsest, params, &self.cfg)?;
        for level in (0..coarsest).rev() {
            if candidates.is_empty() {
                break;
            }
            candidates = refine::refine_level(
                backend,
                &pyramid,
                &compiled,
                level,
                &candidates,
                params,
                &self.cfg,
            )?;
        }

        candidates.retain(|peak| peak.score >= params.strong_threshold);
        let mut finals = nms_2d(&mut candidates, tpl_width / 2, tpl_height / 2);
        finals.truncate(params.limit);
        trace_event!("final_matches", count = finals.len());
        Ok(finals)
    }
}

#[cfg(test)]
mod tests {
    use super::{MaxLevel, SearchParams};
    use crate::util::ImgFindError;

    #[test]
    fn auto_level_keeps_template_at_least_eight_pixels() {
        assert_eq!(MaxLevel::Auto.resolve(7, 40), 0);
        assert_eq!(MaxLevel::Auto.resolve(15, 15), 0);
        assert_eq!(MaxLevel::Auto.resolve(16, 16), 1);
        assert_eq!(MaxLevel::Auto.resolve(64, 33), 2);
        assert_eq!(MaxLevel::Auto.resolve(4096, 4096), 6);
        assert_eq!(MaxLevel::Fixed(3).resolve(8, 8), 3);
    }

    #[test]
    fn thresholds_are_validated() {
        let bad = SearchParams {
            weak_threshold: 1.5,
            ..SearchParams::default()
        };
        assert!(matches!(
            bad.validated(),
            Err(ImgFindError::InvalidThreshold {
                name: "weak_threshold",
                ..
            })
        ));
        let nan = SearchParams {
            strong_threshold: f32::NAN,
            ..SearchParams::default()
        };
        assert!(nan.validated().is_err());
        assert!(SearchParams::default().validated().is_ok());
    }
}
