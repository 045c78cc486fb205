//! Low-fidelity placeholder thumbnails with WebP output.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::decode::{CodecError, DecodedImage, EncodeFormat, EncodeOptions, ImageCodec};

/// Prefix of every placeholder data URL.
pub const DATA_URL_PREFIX: &str = "data:image/webp;base64,";

/// One persisted placeholder, `{metaRoot}/{thumbnailSize}/{uniqueName}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// `data:image/webp;base64,...`
    pub placeholder: String,
    /// Thumbnail width in pixels
    pub width: u32,
    /// Thumbnail height in pixels
    pub height: u32,
}

/// Generates placeholders at a fixed width.
pub struct ThumbnailGenerator {
    width: u32,
}

impl ThumbnailGenerator {
    pub fn new(width: u32) -> Self {
        Self { width }
    }

    /// Resize to the placeholder width and encode as a WebP data URL.
    ///
    /// Images already narrower than the placeholder keep their width.
    pub fn generate(
        &self,
        codec: &dyn ImageCodec,
        image: &DecodedImage,
        options: &EncodeOptions,
    ) -> Result<Placeholder, CodecError> {
        let width = self.width.min(image.width);
        let thumbnail = codec.resize(image, width)?;
        let bytes = codec.encode(&thumbnail, EncodeFormat::WebP, options)?;
        Ok(Placeholder {
            placeholder: format!("{DATA_URL_PREFIX}{}", BASE64.encode(bytes)),
            width: thumbnail.width,
            height: thumbnail.height,
        })
    }
}

/// Location of an image's placeholder inside `thumbnail_dir`.
pub fn placeholder_path(thumbnail_dir: &Path, unique_name: &str) -> PathBuf {
    thumbnail_dir.join(format!("{unique_name}.json"))
}

/// Read a persisted placeholder. Missing or unreadable files yield `None`.
pub fn load_placeholder(thumbnail_dir: &Path, unique_name: &str) -> Option<Placeholder> {
    let path = placeholder_path(thumbnail_dir, unique_name);
    let raw = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(placeholder) => Some(placeholder),
        Err(e) => {
            tracing::warn!("Ignoring unreadable placeholder {:?}: {e}", path);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::RasterCodec;
    use image::DynamicImage;

    const OPTIONS: EncodeOptions = EncodeOptions {
        quality: 80,
        compression_level: 6,
    };

    #[test]
    fn test_thumbnail_generation() {
        let generator = ThumbnailGenerator::new(20);
        let image = DecodedImage::new(DynamicImage::new_rgb8(1000, 500));
        let placeholder = generator.generate(&RasterCodec, &image, &OPTIONS).unwrap();

        assert!(placeholder.placeholder.starts_with(DATA_URL_PREFIX));
        assert_eq!((placeholder.width, placeholder.height), (20, 10));

        let encoded = &placeholder.placeholder[DATA_URL_PREFIX.len()..];
        let bytes = BASE64.decode(encoded).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn test_thumbnail_never_upscales() {
        let generator = ThumbnailGenerator::new(64);
        let image = DecodedImage::new(DynamicImage::new_rgb8(10, 10));
        let placeholder = generator.generate(&RasterCodec, &image, &OPTIONS).unwrap();
        assert_eq!(placeholder.width, 10);
    }

    #[test]
    fn test_placeholder_file_shape() {
        let dir = tempfile::tempdir().unwrap();
        let placeholder = Placeholder {
            placeholder: format!("{DATA_URL_PREFIX}AAAA"),
            width: 20,
            height: 15,
        };
        std::fs::write(
            placeholder_path(dir.path(), "abc-logo"),
            serde_json::to_vec(&placeholder).unwrap(),
        )
        .unwrap();

        assert_eq!(load_placeholder(dir.path(), "abc-logo"), Some(placeholder));
        assert_eq!(load_placeholder(dir.path(), "missing"), None);
    }
}
