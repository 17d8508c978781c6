//! Low-level building blocks for custom matching pipelines.
//!
//! These expose pyramids, template plans, kernels and candidate pruning for
//! callers that drive the search themselves. Most users should prefer
//! [`Matcher`](crate::Matcher) or [`Images`](crate::Images).

pub use crate::candidate::nms::nms_2d;
pub use crate::candidate::topk::{Peak, TopK};
pub use crate::image::pyramid::{ImagePyramid, OwnedImage, PlanarPyramid};
pub use crate::kernel::scalar::ZnccScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::ZnccSimd;
pub use crate::kernel::{Kernel, ScanParams, ZnccTerms, DEFAULT_MIN_VAR_I, FLAT_RMS_SCALE};
pub use crate::template::{CompiledTemplate, TemplatePlan};
