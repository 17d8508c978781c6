//! Image buffers, grayscale views and pyramid utilities.
//!
//! Two layers live here. [`ImageBuffer`] is the owned, releasable RGBA or
//! grayscale handle that callers pass around and that transforms consume.
//! [`ImageView`] is a borrowed 2D grayscale view with an explicit stride that
//! the matcher works on. The stride counts elements between the starts of
//! consecutive rows; region views are zero-copy and retain the parent stride.

use crate::util::{ImgFindError, ImgFindResult};

pub mod buffer;
pub mod codec;
pub mod pyramid;
pub mod transform;

pub use buffer::{ImageBuffer, PixelFormat};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Creates a region from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ImgFindResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> ImgFindResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ImgFindError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy view of a rectangle that must lie fully inside.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> ImgFindResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(ImgFindError::InvalidDimensions { width, height });
        }

        let out_of_bounds = ImgFindError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if x >= self.width || y >= self.height || end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(ImgFindError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(ImgFindError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride)
    }

    /// Returns a view of `region` clipped to the image bounds.
    ///
    /// The region must start inside the image; its far edges are clipped.
    pub fn clipped_roi(&self, region: Region) -> ImgFindResult<ImageView<'a, T>> {
        let x = region.x as usize;
        let y = region.y as usize;
        let width = region.width as usize;
        let height = region.height as usize;
        if width == 0 || height == 0 {
            return Err(ImgFindError::InvalidDimensions { width, height });
        }
        if x >= self.width || y >= self.height {
            return Err(ImgFindError::RoiOutOfBounds {
                x,
                y,
                width,
                height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);
        self.roi(x, y, width, height)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ImgFindResult<usize> {
    if width == 0 || height == 0 {
        return Err(ImgFindError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ImgFindError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ImgFindError::InvalidDimensions { width, height })?;
    Ok(needed)
}
