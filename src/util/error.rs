//! Error types for imgfind.

use thiserror::Error;

/// Result alias for imgfind operations.
pub type ImgFindResult<T> = std::result::Result<T, ImgFindError>;

/// Errors that can occur when matching, transforming or capturing images.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ImgFindError {
    /// A required buffer was not supplied or has already been released.
    #[error("{op}: argument `{arg}` is missing or already released")]
    MissingArgument {
        /// Operation that received the argument.
        op: &'static str,
        /// Name of the missing argument.
        arg: &'static str,
    },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is too small for the declared shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A rectangle does not fit inside the image.
    #[error(
        "region ({x}, {y}, {width}x{height}) out of bounds for image {img_width}x{img_height}"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The template does not fit in the (clipped) search image.
    #[error("template {tpl_width}x{tpl_height} larger than search image {img_width}x{img_height}")]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Source and template planes disagree in count, or there are none.
    #[error("channel mismatch: image has {image} planes, template has {template}")]
    ChannelMismatch { image: usize, template: usize },
    /// A threshold is outside `[0, 1]` or not finite.
    #[error("threshold `{name}` must lie in [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// Encoding quality is outside `0..=100`.
    #[error("quality must lie in 0..=100, got {0}")]
    InvalidQuality(u32),
    /// Unrecognized image format name.
    #[error("unknown image format `{0}`")]
    UnknownFormat(String),
    /// Unrecognized concatenation direction.
    #[error("unknown concat direction `{0}`")]
    UnknownDirection(String),
    /// Screen capture was attempted without authorization.
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
    /// A blocking wait exceeded its deadline.
    #[error("timed out after {waited_ms} ms waiting for {what}")]
    Timeout { what: &'static str, waited_ms: u64 },
    /// The other side of a handoff went away without replying.
    #[error("{0} was dropped without a reply")]
    Disconnected(&'static str),
    /// A pyramid level or similar index was out of range.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// Image decoding or encoding failed.
    #[error("image codec error: {reason}")]
    ImageIo { reason: String },
    /// Base64 payload could not be decoded.
    #[error("base64 decode error: {reason}")]
    Base64 { reason: String },
    /// Filesystem access failed.
    #[error("io error: {reason}")]
    Io { reason: String },
}

impl ImgFindError {
    /// Returns true for errors caused by the caller's arguments.
    ///
    /// These are reported synchronously and never worth retrying.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ImgFindError::MissingArgument { .. }
                | ImgFindError::InvalidDimensions { .. }
                | ImgFindError::InvalidStride { .. }
                | ImgFindError::BufferTooSmall { .. }
                | ImgFindError::RoiOutOfBounds { .. }
                | ImgFindError::TemplateTooLarge { .. }
                | ImgFindError::ChannelMismatch { .. }
                | ImgFindError::InvalidThreshold { .. }
                | ImgFindError::InvalidQuality(_)
                | ImgFindError::UnknownFormat(_)
                | ImgFindError::UnknownDirection(_)
        )
    }
}

impl From<::image::ImageError> for ImgFindError {
    fn from(err: ::image::ImageError) -> Self {
        ImgFindError::ImageIo {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ImgFindError {
    fn from(err: std::io::Error) -> Self {
        ImgFindError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for ImgFindError {
    fn from(err: base64::DecodeError) -> Self {
        ImgFindError::Base64 {
            reason: err.to_string(),
        }
    }
}
