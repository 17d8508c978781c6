//! Encoding and decoding of [`ImageBuffer`] at the persistence boundary.
//!
//! PNG is lossless. JPEG honours the quality setting and drops alpha. WEBP is
//! written with the lossless encoder, so quality does not apply to it. Base64
//! uses the standard alphabet with padding and no line wrapping.

use crate::image::{ImageBuffer, PixelFormat};
use crate::util::{ImgFindError, ImgFindResult};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::codecs::png::PngEncoder;
use ::image::codecs::webp::WebPEncoder;
use ::image::DynamicImage;
use base64::engine::general_purpose;
use base64::Engine as _;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Encoded image container format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Returns the canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    /// Guesses the format from a path extension.
    pub fn from_path(path: impl AsRef<Path>) -> ImgFindResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ImgFindError::UnknownFormat(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for ImageFormat {
    type Err = ImgFindError;

    fn from_str(s: &str) -> ImgFindResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            _ => Err(ImgFindError::UnknownFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encodes `img` into `format` with `quality` in `0..=100`.
pub fn encode(img: ImageBuffer, format: ImageFormat, quality: u32) -> ImgFindResult<Vec<u8>> {
    let src_format = img.format();
    let src = img.take("encode", "image")?;
    if quality > 100 {
        return Err(ImgFindError::InvalidQuality(quality));
    }

    let mut out = Vec::new();
    match format {
        ImageFormat::Png => src.write_with_encoder(PngEncoder::new(&mut out))?,
        ImageFormat::Jpeg => {
            // The encoder rejects quality 0.
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.max(1) as u8);
            match src_format {
                PixelFormat::Gray8 => src.write_with_encoder(encoder)?,
                PixelFormat::Rgba8 => {
                    DynamicImage::ImageRgb8(src.to_rgb8()).write_with_encoder(encoder)?
                }
            }
        }
        ImageFormat::Webp => src.write_with_encoder(WebPEncoder::new_lossless(&mut out))?,
    }
    Ok(out)
}

/// Encodes by format name, e.g. `"PNG"` or `"jpg"`.
pub fn encode_named(img: ImageBuffer, format: &str, quality: u32) -> ImgFindResult<Vec<u8>> {
    match format.parse::<ImageFormat>() {
        Ok(format) => encode(img, format, quality),
        Err(err) => {
            drop(img);
            Err(err)
        }
    }
}

/// Decodes PNG, JPEG or WEBP bytes into a new buffer.
pub fn decode(bytes: &[u8]) -> ImgFindResult<ImageBuffer> {
    let img = ::image::load_from_memory(bytes)?;
    ImageBuffer::from_dynamic(img)
}

/// Encodes `img` and returns the base64 text without line breaks.
pub fn to_base64(img: ImageBuffer, format: ImageFormat, quality: u32) -> ImgFindResult<String> {
    let bytes = encode(img, format, quality)?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

/// Decodes a base64 payload holding an encoded image.
pub fn from_base64(data: &str) -> ImgFindResult<ImageBuffer> {
    let bytes = general_purpose::STANDARD.decode(data.trim())?;
    decode(&bytes)
}

/// Encodes `img` and writes it to `path`.
pub fn save(
    img: ImageBuffer,
    path: impl AsRef<Path>,
    format: ImageFormat,
    quality: u32,
) -> ImgFindResult<()> {
    let bytes = encode(img, format, quality)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Reads and decodes the image stored at `path`.
pub fn read(path: impl AsRef<Path>) -> ImgFindResult<ImageBuffer> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::ImageFormat;
    use crate::util::ImgFindError;

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("Jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("WebP".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
        assert_eq!(
            "bmp".parse::<ImageFormat>().err().unwrap(),
            ImgFindError::UnknownFormat("bmp".to_owned())
        );
    }

    #[test]
    fn format_from_path_uses_extension() {
        assert_eq!(
            ImageFormat::from_path("shots/a.JPG").unwrap(),
            ImageFormat::Jpeg
        );
        assert!(ImageFormat::from_path("shots/noext").is_err());
    }
}
