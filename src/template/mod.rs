//! Template storage and per-level planning.

use crate::image::pyramid::PlanarPyramid;
use crate::image::ImageView;
use crate::util::{ImgFindError, ImgFindResult};

mod plan;

pub use plan::TemplatePlan;

/// Template pyramid with a ZNCC plan for each level and channel plane.
///
/// Building the pyramid and plans once amortizes their cost across every
/// level of a coarse-to-fine search.
pub struct CompiledTemplate {
    sizes: Vec<(usize, usize)>,
    plans: Vec<Vec<TemplatePlan>>,
}

impl CompiledTemplate {
    /// Compiles `levels` pyramid levels (at least one) from a grayscale template.
    pub fn compile(tpl: ImageView<'_, u8>, levels: usize) -> ImgFindResult<Self> {
        Self::compile_planes(&[tpl], levels)
    }

    /// Compiles one plan per channel plane at every level.
    pub fn compile_planes(planes: &[ImageView<'_, u8>], levels: usize) -> ImgFindResult<Self> {
        let pyramid = PlanarPyramid::build(planes, levels)?;
        let mut sizes = Vec::with_capacity(pyramid.len());
        let mut plans = Vec::with_capacity(pyramid.len());
        for level in 0..pyramid.len() {
            let views = pyramid.level(level).ok_or(ImgFindError::IndexOutOfBounds {
                index: level,
                len: pyramid.len(),
                context: "template level",
            })?;
            let level_plans = views
                .into_iter()
                .map(TemplatePlan::from_view)
                .collect::<ImgFindResult<Vec<_>>>()?;
            let size = level_plans
                .first()
                .map(|plan| (plan.width(), plan.height()))
                .unwrap_or((0, 0));
            sizes.push(size);
            plans.push(level_plans);
        }
        Ok(Self { sizes, plans })
    }

    /// Returns the number of pyramid levels.
    pub fn num_levels(&self) -> usize {
        self.plans.len()
    }

    /// Returns the number of channel planes.
    pub fn num_planes(&self) -> usize {
        self.plans.first().map_or(0, Vec::len)
    }

    /// Returns the width and height for a pyramid level.
    pub fn level_size(&self, level: usize) -> Option<(usize, usize)> {
        self.sizes.get(level).copied()
    }

    /// Returns the per-plane plans for a pyramid level.
    pub fn plans(&self, level: usize) -> Option<&[TemplatePlan]> {
        self.plans.get(level).map(Vec::as_slice)
    }
}
