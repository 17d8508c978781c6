//! Correlation backend selection.
//!
//! The backend is chosen once per process on first use. Concurrent first
//! callers block inside `OnceLock::get_or_init` until the choice is made, so
//! matching never observes a half-initialized backend.

use crate::candidate::topk::Peak;
use crate::image::ImageView;
use crate::kernel::scalar::ZnccScalar;
use crate::kernel::{Kernel, ScanParams};
use crate::template::TemplatePlan;
use crate::trace::trace_event;
use crate::util::ImgFindResult;
use std::sync::OnceLock;

static ACTIVE: OnceLock<Backend> = OnceLock::new();

/// Kernel family used for correlation scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Portable scalar loops.
    Scalar,
    /// `wide` SIMD lanes (requires the `simd` feature; scalar otherwise).
    Simd,
}

impl Backend {
    /// Returns a short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::Simd => "simd",
        }
    }

    /// Scores one placement with this backend's kernel.
    pub(crate) fn score_at(
        self,
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        match self {
            #[cfg(feature = "simd")]
            Backend::Simd => {
                <crate::kernel::simd::ZnccSimd as Kernel>::score_at(image, plan, x, y, min_var_i)
            }
            _ => <ZnccScalar as Kernel>::score_at(image, plan, x, y, min_var_i),
        }
    }

    /// Scans an inclusive placement range with this backend's kernel.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn scan_roi(
        self,
        images: &[ImageView<'_, u8>],
        plans: &[TemplatePlan],
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        params: ScanParams,
    ) -> ImgFindResult<Vec<Peak>> {
        match self {
            #[cfg(feature = "simd")]
            Backend::Simd => <crate::kernel::simd::ZnccSimd as Kernel>::scan_roi(
                images, plans, x0, y0, x1, y1, params,
            ),
            _ => <ZnccScalar as Kernel>::scan_roi(images, plans, x0, y0, x1, y1, params),
        }
    }

    /// Scans every valid placement, optionally splitting rows across threads.
    ///
    /// `parallel` is ignored without the `rayon` feature.
    pub(crate) fn scan_full(
        self,
        images: &[ImageView<'_, u8>],
        plans: &[TemplatePlan],
        params: ScanParams,
        parallel: bool,
    ) -> ImgFindResult<Vec<Peak>> {
        #[cfg(feature = "rayon")]
        if parallel {
            use crate::kernel::rayon::scan_full_par;
            return match self {
                #[cfg(feature = "simd")]
                Backend::Simd => {
                    scan_full_par::<crate::kernel::simd::ZnccSimd>(images, plans, params)
                }
                _ => scan_full_par::<ZnccScalar>(images, plans, params),
            };
        }
        #[cfg(not(feature = "rayon"))]
        let _ = parallel;

        match self {
            #[cfg(feature = "simd")]
            Backend::Simd => {
                <crate::kernel::simd::ZnccSimd as Kernel>::scan_full(images, plans, params)
            }
            _ => <ZnccScalar as Kernel>::scan_full(images, plans, params),
        }
    }
}

fn detect() -> Backend {
    if cfg!(feature = "simd") {
        Backend::Simd
    } else {
        Backend::Scalar
    }
}

/// Returns the process-wide backend, initializing it on first call.
pub fn active() -> Backend {
    *ACTIVE.get_or_init(|| {
        let backend = detect();
        trace_event!("backend_initialized", backend = backend.name());
        backend
    })
}

/// Returns true once [`active`] has run at least once.
pub fn is_initialized() -> bool {
    ACTIVE.get().is_some()
}
