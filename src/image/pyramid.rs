//! Image pyramid construction for single-channel `u8` planes.
//!
//! Downsampling uses a 2x2 box filter with integer rounding:
//! `dst = ((a + b + c + d) + 2) / 4`. Odd trailing rows and columns are
//! dropped, so a level is `floor(w / 2) x floor(h / 2)` of its parent.
//! Colour images are matched as separate R, G and B planes, each with its
//! own pyramid (see [`PlanarPyramid`]).

use crate::image::ImageView;
use crate::util::{ImgFindError, ImgFindResult};

/// Owned contiguous grayscale image buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Creates an owned image from a contiguous row-major buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> ImgFindResult<Self> {
        if width == 0 || height == 0 {
            return Err(ImgFindError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(ImgFindError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ImgFindError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(ImgFindError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a (possibly strided) view into a contiguous image.
    pub fn from_view(view: ImageView<'_, u8>) -> ImgFindResult<Self> {
        let width = view.width();
        let height = view.height();
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            data.extend_from_slice(row_of(view, y)?);
        }
        Self::new(data, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

/// Owned image pyramid built from a base level.
pub struct ImagePyramid {
    levels: Vec<OwnedImage>,
}

impl ImagePyramid {
    /// Builds a pyramid from a base grayscale view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always
    /// present. Construction stops early once a level would drop below 1x1.
    pub fn build_u8(base: ImageView<'_, u8>, max_levels: usize) -> ImgFindResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = Vec::with_capacity(max_levels);
        levels.push(OwnedImage::from_view(base)?);

        while levels.len() < max_levels {
            let Some(prev) = levels.last() else { break };
            let src = prev.view();
            if src.width() < 2 || src.height() < 2 {
                break;
            }
            let next = downsample_2x(src)?;
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[OwnedImage] {
        &self.levels
    }

    /// Returns the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if the pyramid has no levels.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns a view for a specific pyramid level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(|level| level.view())
    }

    /// Consumes the pyramid and returns its levels.
    pub fn into_levels(self) -> Vec<OwnedImage> {
        self.levels
    }
}

/// One pyramid per channel plane, all built from planes of the same size.
pub struct PlanarPyramid {
    planes: Vec<ImagePyramid>,
}

impl PlanarPyramid {
    /// Builds a pyramid for every plane.
    ///
    /// Fails when `planes` is empty or the planes differ in size.
    pub fn build(planes: &[ImageView<'_, u8>], max_levels: usize) -> ImgFindResult<Self> {
        let Some(first) = planes.first() else {
            return Err(ImgFindError::InvalidDimensions {
                width: 0,
                height: 0,
            });
        };
        if let Some(odd) = planes
            .iter()
            .find(|p| p.width() != first.width() || p.height() != first.height())
        {
            return Err(ImgFindError::InvalidDimensions {
                width: odd.width(),
                height: odd.height(),
            });
        }
        let planes = planes
            .iter()
            .map(|&plane| ImagePyramid::build_u8(plane, max_levels))
            .collect::<ImgFindResult<Vec<_>>>()?;
        Ok(Self { planes })
    }

    /// Returns the number of levels shared by every plane.
    pub fn len(&self) -> usize {
        self.planes.iter().map(ImagePyramid::len).min().unwrap_or(0)
    }

    /// Returns true if no level is available.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of channel planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Returns the views of every plane at `index`.
    pub fn level(&self, index: usize) -> Option<Vec<ImageView<'_, u8>>> {
        self.planes.iter().map(|plane| plane.level(index)).collect()
    }
}

/// Halves a view with a 2x2 box filter.
pub(crate) fn downsample_2x(src: ImageView<'_, u8>) -> ImgFindResult<OwnedImage> {
    let dst_width = src.width() / 2;
    let dst_height = src.height() / 2;
    let dst_len = dst_width
        .checked_mul(dst_height)
        .ok_or(ImgFindError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        })?;
    let mut dst = vec![0u8; dst_len];

    for y in 0..dst_height {
        let row0 = row_of(src, y * 2)?;
        let row1 = row_of(src, y * 2 + 1)?;
        let out = &mut dst[y * dst_width..(y + 1) * dst_width];
        for (x, px) in out.iter_mut().enumerate() {
            let sum = u16::from(row0[2 * x])
                + u16::from(row0[2 * x + 1])
                + u16::from(row1[2 * x])
                + u16::from(row1[2 * x + 1]);
            *px = ((sum + 2) / 4) as u8;
        }
    }

    OwnedImage::new(dst, dst_width, dst_height)
}

fn row_of<'a>(view: ImageView<'a, u8>, y: usize) -> ImgFindResult<&'a [u8]> {
    view.row(y).ok_or_else(|| {
        let needed = (y + 1)
            .checked_mul(view.stride())
            .and_then(|v| v.checked_add(view.width()))
            .unwrap_or(usize::MAX);
        ImgFindError::BufferTooSmall {
            needed,
            got: view.as_slice().len(),
        }
    })
}
