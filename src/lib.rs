//! imgfind locates template images inside screen captures.
//!
//! Matching is a coarse-to-fine ZNCC search over 2x box-filter pyramids, with
//! optional row parallelism via the `rayon` feature and SIMD scoring via the
//! `simd` feature. Around the matcher sit an owned, releasable
//! [`ImageBuffer`], image transforms and codecs, a capture session with a
//! blocking permission handoff, and display-coordinate mapping.

pub mod backend;
mod candidate;
pub mod capture;
pub mod coords;
pub mod handoff;
pub mod image;
pub mod images;
pub mod kernel;
pub mod lowlevel;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use crate::backend::Backend;
pub use crate::capture::{CaptureAuthorizer, CaptureConfig, CaptureSession, CaptureSource};
pub use crate::coords::{map_point, unmap_point, DisplayMetrics, DisplayScale, Point, ScreenMetrics};
pub use crate::image::codec::ImageFormat;
pub use crate::image::transform::Direction;
pub use crate::image::{ImageBuffer, ImageView, PixelFormat, Region};
pub use crate::images::Images;
pub use crate::kernel::zncc;
pub use crate::search::{MatchConfig, MatchRequest, MatchResult, Matcher, MaxLevel, SearchParams};
pub use crate::util::{ImgFindError, ImgFindResult};
