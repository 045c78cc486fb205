//! Image codec boundary: decode, resize and re-encode.
//!
//! The pipeline only talks to pixels through [`ImageCodec`], a byte-in,
//! bytes-plus-dimensions-out interface. [`RasterCodec`] is the production
//! implementation on top of the `image` crate. All methods are blocking and
//! are run on tokio's blocking pool by the processor.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Invalid(String),
}

/// A decoded image shared by every derivative of one source.
#[derive(Clone)]
pub struct DecodedImage {
    /// The decoded pixels
    pub image: Arc<DynamicImage>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image: Arc::new(image),
            width,
            height,
        }
    }
}

/// Encoded output format of a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Jpeg,
    Png,
    WebP,
}

impl EncodeFormat {
    /// Derivatives keep the family of their source: JPEG stays lossy, WebP
    /// stays WebP, everything else becomes PNG.
    pub fn for_source(image_type: &str) -> Self {
        match image_type {
            "jpeg" | "jpg" => EncodeFormat::Jpeg,
            "webp" => EncodeFormat::WebP,
            _ => EncodeFormat::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
            EncodeFormat::WebP => "webp",
        }
    }
}

/// Encoder settings taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// PNG compression level (0-9)
    pub compression_level: u8,
}

impl EncodeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            quality: config.optimised_image_colour_quality,
            compression_level: config.optimised_image_compression_level,
        }
    }

    fn png_compression(self) -> CompressionType {
        match self.compression_level {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

/// Pixel operations the pipeline needs.
pub trait ImageCodec: Send + Sync {
    /// Decode encoded bytes and read their intrinsic dimensions.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError>;

    /// Resize to `width`, preserving the aspect ratio.
    fn resize(&self, image: &DecodedImage, width: u32) -> Result<DecodedImage, CodecError>;

    /// Encode into `format`.
    fn encode(
        &self,
        image: &DecodedImage,
        format: EncodeFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError>;
}

/// `image`-crate backed codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
        let image = image::load_from_memory(bytes)?;
        Ok(DecodedImage::new(image))
    }

    fn resize(&self, image: &DecodedImage, width: u32) -> Result<DecodedImage, CodecError> {
        if image.width == 0 || width == 0 {
            return Err(CodecError::Invalid("cannot resize a zero-width image".into()));
        }
        let height = scaled_height(image.width, image.height, width);
        let resized = image.image.resize_exact(width, height, FilterType::Lanczos3);
        Ok(DecodedImage::new(resized))
    }

    fn encode(
        &self,
        image: &DecodedImage,
        format: EncodeFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            EncodeFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, options.quality);
                rgb.write_with_encoder(encoder)?;
            }
            EncodeFormat::Png => {
                let pixels = if image.image.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.image.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.image.to_rgb8())
                };
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    options.png_compression(),
                    PngFilter::Adaptive,
                );
                pixels.write_with_encoder(encoder)?;
            }
            EncodeFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(image.image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
            }
        }
        Ok(buffer.into_inner())
    }
}

/// Height matching `target_width` at the source aspect ratio, at least 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (u64::from(height) * u64::from(target_width) + u64::from(width) / 2)
        / u64::from(width.max(1));
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}
