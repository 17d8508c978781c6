//! Owned, releasable image handle.
//!
//! `ImageBuffer` stores either RGBA8 or Gray8 pixels. Operations that derive a
//! new image take the buffer by value, so a consumed buffer cannot be touched
//! again. A buffer can also be released early with [`ImageBuffer::release`];
//! it then keeps its shape but no pixels, and any operation handed a released
//! buffer fails with [`ImgFindError::MissingArgument`].

use crate::image::pyramid::OwnedImage;
use crate::trace::trace_event;
use crate::util::{ImgFindError, ImgFindResult};
use ::image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use std::fmt;

/// Pixel layout of an [`ImageBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Four interleaved 8-bit channels: red, green, blue, alpha.
    Rgba8,
    /// One 8-bit luminance channel.
    Gray8,
}

impl PixelFormat {
    /// Returns the number of bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Owned 2D pixel buffer with an explicit, idempotent release.
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Option<DynamicImage>,
}

impl ImageBuffer {
    /// Creates an RGBA buffer from row-major interleaved bytes.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> ImgFindResult<Self> {
        check_len(data.len(), width, height, PixelFormat::Rgba8)?;
        let img = RgbaImage::from_raw(width, height, data).ok_or(
            ImgFindError::InvalidDimensions {
                width: width as usize,
                height: height as usize,
            },
        )?;
        Ok(Self::wrap(DynamicImage::ImageRgba8(img)))
    }

    /// Creates a grayscale buffer from row-major bytes.
    pub fn from_gray(data: Vec<u8>, width: u32, height: u32) -> ImgFindResult<Self> {
        check_len(data.len(), width, height, PixelFormat::Gray8)?;
        let img = GrayImage::from_raw(width, height, data).ok_or(
            ImgFindError::InvalidDimensions {
                width: width as usize,
                height: height as usize,
            },
        )?;
        Ok(Self::wrap(DynamicImage::ImageLuma8(img)))
    }

    /// Creates an RGBA buffer filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> ImgFindResult<Self> {
        check_dims(width, height)?;
        Ok(Self::wrap(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba(rgba),
        ))))
    }

    /// Wraps a decoded image, normalizing it to RGBA8 or Gray8.
    pub fn from_dynamic(img: DynamicImage) -> ImgFindResult<Self> {
        check_dims(img.width(), img.height())?;
        let img = match img {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gray),
            DynamicImage::ImageRgba8(rgba) => DynamicImage::ImageRgba8(rgba),
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        };
        Ok(Self::wrap(img))
    }

    pub(crate) fn wrap(img: DynamicImage) -> Self {
        let format = match img {
            DynamicImage::ImageLuma8(_) => PixelFormat::Gray8,
            _ => PixelFormat::Rgba8,
        };
        Self {
            width: img.width(),
            height: img.height(),
            format,
            pixels: Some(img),
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns true once the pixels have been released.
    pub fn is_released(&self) -> bool {
        self.pixels.is_none()
    }

    /// Frees the pixel storage. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.pixels.take().is_some() {
            trace_event!("buffer_released", width = self.width, height = self.height);
        }
    }

    /// Returns the raw interleaved bytes.
    pub fn as_raw(&self) -> ImgFindResult<&[u8]> {
        Ok(self.dynamic("ImageBuffer::as_raw", "self")?.as_bytes())
    }

    /// Returns the color at `(x, y)` packed as `0xAARRGGBB`.
    pub fn pixel_argb(&self, x: u32, y: u32) -> ImgFindResult<u32> {
        let img = self.dynamic("ImageBuffer::pixel_argb", "self")?;
        if x >= self.width || y >= self.height {
            return Err(ImgFindError::RoiOutOfBounds {
                x: x as usize,
                y: y as usize,
                width: 1,
                height: 1,
                img_width: self.width as usize,
                img_height: self.height as usize,
            });
        }
        let [r, g, b, a] = match img {
            DynamicImage::ImageLuma8(gray) => {
                let v = gray.get_pixel(x, y).0[0];
                [v, v, v, 255]
            }
            DynamicImage::ImageRgba8(rgba) => rgba.get_pixel(x, y).0,
            other => other.to_rgba8().get_pixel(x, y).0,
        };
        Ok((u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Consumes the buffer and returns the underlying decoded image.
    pub fn into_dynamic(self) -> ImgFindResult<DynamicImage> {
        self.take("ImageBuffer::into_dynamic", "self")
    }

    /// Borrows the pixels, failing with an error naming `arg` if released.
    pub(crate) fn dynamic(&self, op: &'static str, arg: &'static str) -> ImgFindResult<&DynamicImage> {
        self.pixels
            .as_ref()
            .ok_or(ImgFindError::MissingArgument { op, arg })
    }

    /// Moves the pixels out, failing with an error naming `arg` if released.
    pub(crate) fn take(mut self, op: &'static str, arg: &'static str) -> ImgFindResult<DynamicImage> {
        self.pixels
            .take()
            .ok_or(ImgFindError::MissingArgument { op, arg })
    }

    /// Copies the pixels into an independent buffer.
    pub(crate) fn duplicate(&self, op: &'static str) -> ImgFindResult<ImageBuffer> {
        Ok(Self::wrap(self.dynamic(op, "image")?.clone()))
    }

    /// Splits the pixels into owned planes for matching.
    ///
    /// With `color` an RGBA buffer yields its R, G and B planes (alpha is
    /// not matched); otherwise the single luminance plane is returned.
    pub(crate) fn to_planes(
        &self,
        op: &'static str,
        arg: &'static str,
        color: bool,
    ) -> ImgFindResult<Vec<OwnedImage>> {
        let (width, height) = (self.width as usize, self.height as usize);
        match self.dynamic(op, arg)? {
            DynamicImage::ImageRgba8(rgba) if color => {
                let mut planes = [
                    Vec::with_capacity(width * height),
                    Vec::with_capacity(width * height),
                    Vec::with_capacity(width * height),
                ];
                for px in rgba.pixels() {
                    for (plane, &value) in planes.iter_mut().zip(&px.0[..3]) {
                        plane.push(value);
                    }
                }
                planes
                    .into_iter()
                    .map(|plane| OwnedImage::new(plane, width, height))
                    .collect()
            }
            DynamicImage::ImageLuma8(gray) => {
                Ok(vec![OwnedImage::new(gray.as_raw().clone(), width, height)?])
            }
            other => Ok(vec![OwnedImage::new(
                other.to_luma8().into_raw(),
                width,
                height,
            )?]),
        }
    }
}

impl TryFrom<DynamicImage> for ImageBuffer {
    type Error = ImgFindError;

    fn try_from(img: DynamicImage) -> ImgFindResult<Self> {
        Self::from_dynamic(img)
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("released", &self.is_released())
            .finish()
    }
}

fn check_dims(width: u32, height: u32) -> ImgFindResult<()> {
    if width == 0 || height == 0 {
        return Err(ImgFindError::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }
    Ok(())
}

fn check_len(got: usize, width: u32, height: u32, format: PixelFormat) -> ImgFindResult<()> {
    check_dims(width, height)?;
    let needed = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(format.channels()))
        .ok_or(ImgFindError::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        })?;
    if got < needed {
        return Err(ImgFindError::BufferTooSmall { needed, got });
    }
    if got > needed {
        return Err(ImgFindError::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ImageBuffer, PixelFormat};
    use crate::util::ImgFindError;

    #[test]
    fn release_is_idempotent() {
        let mut buf = ImageBuffer::filled(4, 3, [1, 2, 3, 255]).unwrap();
        assert!(!buf.is_released());
        buf.release();
        buf.release();
        assert!(buf.is_released());
        assert_eq!(buf.dimensions(), (4, 3));
        assert!(matches!(
            buf.as_raw(),
            Err(ImgFindError::MissingArgument { arg: "self", .. })
        ));
    }

    #[test]
    fn pixel_argb_packs_channels() {
        let buf = ImageBuffer::from_rgba(vec![0x11, 0x22, 0x33, 0x44], 1, 1).unwrap();
        assert_eq!(buf.pixel_argb(0, 0).unwrap(), 0x4411_2233);

        let gray = ImageBuffer::from_gray(vec![0x80], 1, 1).unwrap();
        assert_eq!(gray.format(), PixelFormat::Gray8);
        assert_eq!(gray.pixel_argb(0, 0).unwrap(), 0xFF80_8080);
        assert!(gray.pixel_argb(1, 0).is_err());
    }

    #[test]
    fn constructors_validate_length() {
        assert_eq!(
            ImageBuffer::from_gray(vec![0; 5], 3, 2).err().unwrap(),
            ImgFindError::BufferTooSmall { needed: 6, got: 5 }
        );
        assert!(ImageBuffer::from_rgba(vec![0; 8], 0, 2).is_err());
    }

    #[test]
    fn color_planes_split_rgb_and_drop_alpha() {
        let buf = ImageBuffer::from_rgba(vec![10, 20, 30, 255, 40, 50, 60, 0], 2, 1).unwrap();
        let planes = buf.to_planes("test", "image", true).unwrap();
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[0].data(), &[10, 40]);
        assert_eq!(planes[1].data(), &[20, 50]);
        assert_eq!(planes[2].data(), &[30, 60]);

        let luma = buf.to_planes("test", "image", false).unwrap();
        assert_eq!(luma.len(), 1);
        assert_eq!((luma[0].width(), luma[0].height()), (2, 1));
    }
}
