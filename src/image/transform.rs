//! Consuming transforms over [`ImageBuffer`].
//!
//! Every function here takes its inputs by value and returns a freshly owned
//! buffer; inputs are consumed whether the call succeeds or fails.

use crate::image::{ImageBuffer, PixelFormat, Region};
use crate::util::math::{round_to_u8, sin_cos_deg};
use crate::util::{ImgFindError, ImgFindResult};
use ::image::imageops::{self, FilterType};
use ::image::{DynamicImage, GrayImage, RgbaImage};
use std::str::FromStr;

/// Side on which the second image is joined by [`concat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `b` is placed left of `a`.
    Start,
    /// `b` is placed right of `a`.
    End,
    /// `b` is placed above `a`.
    Top,
    /// `b` is placed below `a`.
    Bottom,
}

impl Direction {
    fn is_horizontal(self) -> bool {
        matches!(self, Direction::Start | Direction::End)
    }
}

impl FromStr for Direction {
    type Err = ImgFindError;

    fn from_str(s: &str) -> ImgFindResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "left" => Ok(Direction::Start),
            "end" | "right" => Ok(Direction::End),
            "top" => Ok(Direction::Top),
            "bottom" => Ok(Direction::Bottom),
            _ => Err(ImgFindError::UnknownDirection(s.to_owned())),
        }
    }
}

/// Returns an independent copy of `img`.
pub fn copy(img: ImageBuffer) -> ImgFindResult<ImageBuffer> {
    Ok(ImageBuffer::wrap(img.take("copy", "image")?))
}

/// Reads the `0xAARRGGBB` color at `(x, y)`.
pub fn pixel(img: ImageBuffer, x: u32, y: u32) -> ImgFindResult<u32> {
    if img.is_released() {
        return Err(ImgFindError::MissingArgument {
            op: "pixel",
            arg: "image",
        });
    }
    img.pixel_argb(x, y)
}

/// Crops `region` out of `img`. The region must lie fully inside.
pub fn clip(img: ImageBuffer, region: Region) -> ImgFindResult<ImageBuffer> {
    let (img_width, img_height) = img.dimensions();
    let src = img.take("clip", "image")?;
    let fits = region.width > 0
        && region.height > 0
        && region.x.checked_add(region.width).is_some_and(|end| end <= img_width)
        && region.y.checked_add(region.height).is_some_and(|end| end <= img_height);
    if !fits {
        return Err(ImgFindError::RoiOutOfBounds {
            x: region.x as usize,
            y: region.y as usize,
            width: region.width as usize,
            height: region.height as usize,
            img_width: img_width as usize,
            img_height: img_height as usize,
        });
    }
    Ok(ImageBuffer::wrap(src.crop_imm(
        region.x,
        region.y,
        region.width,
        region.height,
    )))
}

/// Rotates `img` clockwise by `degrees` about the pivot `(px, py)`.
///
/// The output is sized to the bounding box of the rotated image, so no source
/// pixel is cut off; the pivot only fixes where the box would sit on the
/// original canvas. Destination pixel centres are mapped back through the
/// inverse rotation and sampled bilinearly. Corners of the box not covered by
/// the source are transparent for RGBA and black for grayscale.
pub fn rotate(img: ImageBuffer, px: f32, py: f32, degrees: f32) -> ImgFindResult<ImageBuffer> {
    let format = img.format();
    let (width, height) = img.dimensions();
    let src = img.take("rotate", "image")?;
    let channels = format.channels();
    let rotated = rotate_raw(
        src.as_bytes(),
        width as usize,
        height as usize,
        channels,
        (px, py),
        degrees,
    );
    let (out_width, out_height) = (rotated.width as u32, rotated.height as u32);
    let image = match format {
        PixelFormat::Rgba8 => {
            RgbaImage::from_raw(out_width, out_height, rotated.data).map(DynamicImage::ImageRgba8)
        }
        PixelFormat::Gray8 => {
            GrayImage::from_raw(out_width, out_height, rotated.data).map(DynamicImage::ImageLuma8)
        }
    };
    image.map(ImageBuffer::wrap).ok_or(ImgFindError::InvalidDimensions {
        width: rotated.width,
        height: rotated.height,
    })
}

struct Rotated {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

fn rotate_raw(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    pivot: (f32, f32),
    angle_deg: f32,
) -> Rotated {
    let (sin_a, cos_a) = sin_cos_deg(angle_deg);
    let (cx, cy) = pivot;
    // Clockwise in y-down coordinates.
    let forward = |x: f32, y: f32| {
        let (dx, dy) = (x - cx, y - cy);
        (cos_a * dx - sin_a * dy + cx, sin_a * dx + cos_a * dy + cy)
    };

    let (w, h) = (width as f32, height as f32);
    let corners = [forward(0.0, 0.0), forward(w, 0.0), forward(0.0, h), forward(w, h)];
    let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
    let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
    let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);
    if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
        return Rotated {
            data: src.to_vec(),
            width,
            height,
        };
    }
    let out_width = ((max_x - min_x).round() as usize).max(1);
    let out_height = ((max_y - min_y).round() as usize).max(1);

    let mut out = vec![0u8; out_width * out_height * channels];
    let last_x = w - 1.0;
    let last_y = h - 1.0;
    let epsilon = 1e-3;

    for y in 0..out_height {
        for x in 0..out_width {
            let dx = x as f32 + 0.5 + min_x - cx;
            let dy = y as f32 + 0.5 + min_y - cy;
            let src_x = cos_a * dx + sin_a * dy + cx - 0.5;
            let src_y = -sin_a * dx + cos_a * dy + cy - 0.5;
            if src_x < -0.5 - epsilon
                || src_y < -0.5 - epsilon
                || src_x > last_x + 0.5 + epsilon
                || src_y > last_y + 0.5 + epsilon
            {
                continue;
            }

            let src_x = src_x.clamp(0.0, last_x);
            let src_y = src_y.clamp(0.0, last_y);
            let x0 = src_x.floor() as usize;
            let y0 = src_y.floor() as usize;
            let x1 = (x0 + 1).min(width - 1);
            let y1 = (y0 + 1).min(height - 1);
            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;
            let w00 = (1.0 - fx) * (1.0 - fy);
            let w10 = fx * (1.0 - fy);
            let w01 = (1.0 - fx) * fy;
            let w11 = fx * fy;

            let dst = (y * out_width + x) * channels;
            for c in 0..channels {
                let a = src[(y0 * width + x0) * channels + c] as f32;
                let b = src[(y0 * width + x1) * channels + c] as f32;
                let d = src[(y1 * width + x0) * channels + c] as f32;
                let e = src[(y1 * width + x1) * channels + c] as f32;
                out[dst + c] = round_to_u8(a * w00 + b * w10 + d * w01 + e * w11);
            }
        }
    }

    Rotated {
        data: out,
        width: out_width,
        height: out_height,
    }
}

/// Joins two images along `direction`, centering the smaller one across the seam.
pub fn concat(a: ImageBuffer, b: ImageBuffer, direction: Direction) -> ImgFindResult<ImageBuffer> {
    let gray = a.format() == PixelFormat::Gray8 && b.format() == PixelFormat::Gray8;
    let a = a.take("concat", "a");
    let b = b.take("concat", "b");
    let (mut first, mut second) = (a?, b?);
    if matches!(direction, Direction::Start | Direction::Top) {
        std::mem::swap(&mut first, &mut second);
    }

    let (width, height) = if direction.is_horizontal() {
        (
            first.width() + second.width(),
            first.height().max(second.height()),
        )
    } else {
        (
            first.width().max(second.width()),
            first.height() + second.height(),
        )
    };
    let (first_pos, second_pos) = if direction.is_horizontal() {
        (
            (0, (height - first.height()) / 2),
            (first.width(), (height - second.height()) / 2),
        )
    } else {
        (
            ((width - first.width()) / 2, 0),
            ((width - second.width()) / 2, first.height()),
        )
    };

    let joined = if gray {
        let mut canvas = GrayImage::new(width, height);
        imageops::replace(&mut canvas, &first.to_luma8(), first_pos.0.into(), first_pos.1.into());
        imageops::replace(&mut canvas, &second.to_luma8(), second_pos.0.into(), second_pos.1.into());
        DynamicImage::ImageLuma8(canvas)
    } else {
        let mut canvas = RgbaImage::new(width, height);
        imageops::replace(&mut canvas, &first.to_rgba8(), first_pos.0.into(), first_pos.1.into());
        imageops::replace(&mut canvas, &second.to_rgba8(), second_pos.0.into(), second_pos.1.into());
        DynamicImage::ImageRgba8(canvas)
    };
    Ok(ImageBuffer::wrap(joined))
}

/// Scales `img` to exactly `width x height` with nearest-neighbour sampling.
pub fn resize(img: ImageBuffer, width: u32, height: u32) -> ImgFindResult<ImageBuffer> {
    let src = img.take("resize", "image")?;
    if width == 0 || height == 0 {
        return Err(ImgFindError::InvalidDimensions {
            width: width as usize,
            height: height as usize,
        });
    }
    Ok(ImageBuffer::wrap(src.resize_exact(
        width,
        height,
        FilterType::Nearest,
    )))
}

/// Converts `img` to a single-channel luminance buffer.
pub fn grayscale(img: ImageBuffer) -> ImgFindResult<ImageBuffer> {
    let src = img.take("grayscale", "image")?;
    Ok(ImageBuffer::wrap(DynamicImage::ImageLuma8(src.to_luma8())))
}

#[cfg(test)]
mod tests {
    use super::{rotate_raw, Direction};

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("END".parse::<Direction>().unwrap(), Direction::End);
        assert_eq!("Left".parse::<Direction>().unwrap(), Direction::Start);
        assert_eq!(" bottom ".parse::<Direction>().unwrap(), Direction::Bottom);
        assert!("diagonal".parse::<Direction>().is_err());
    }

    #[test]
    fn rotate_raw_zero_angle_is_identity() {
        let src: Vec<u8> = (0u8..12).collect();
        let out = rotate_raw(&src, 4, 3, 1, (1.5, 1.0), 0.0);
        assert_eq!((out.width, out.height), (4, 3));
        assert_eq!(out.data, src);
    }

    #[test]
    fn rotate_raw_quarter_turn_about_center() {
        // 3x3 gray, rotating clockwise.
        let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let out = rotate_raw(&src, 3, 3, 1, (1.5, 1.5), 90.0);
        assert_eq!((out.width, out.height), (3, 3));
        assert_eq!(out.data, vec![7, 4, 1, 8, 5, 2, 9, 6, 3]);
    }

    #[test]
    fn rotate_raw_quarter_turn_keeps_every_pixel_of_wide_image() {
        let src: Vec<u8> = (1u8..=8).collect();
        let out = rotate_raw(&src, 4, 2, 1, (2.0, 1.0), 90.0);
        assert_eq!((out.width, out.height), (2, 4));
        assert_eq!(out.data, vec![5, 1, 6, 2, 7, 3, 8, 4]);
    }

    #[test]
    fn rotate_raw_box_does_not_depend_on_pivot() {
        let src: Vec<u8> = (1u8..=8).collect();
        let centred = rotate_raw(&src, 4, 2, 1, (2.0, 1.0), 90.0);
        let corner = rotate_raw(&src, 4, 2, 1, (0.0, 0.0), 90.0);
        assert_eq!((corner.width, corner.height), (2, 4));
        assert_eq!(corner.data, centred.data);
    }
}
