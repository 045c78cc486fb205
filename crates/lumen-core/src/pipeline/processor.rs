//! Per-file orchestration: decode, then original copy, placeholder and size
//! variants.

use futures_util::future::{join3, join_all};
use std::path::Path;
use std::sync::Arc;

use crate::cache::validate::file_mtime;
use crate::cache::{CacheStore, ContentCacheEntry, InvalidCacheEntry};
use crate::config::{Config, ResolvedPaths};
use crate::error::{PipelineError, PipelineResult};
use crate::types::ImageFileRecord;

use super::decode::{DecodedImage, EncodeFormat, EncodeOptions, ImageCodec};
use super::hash::Hasher;
use super::naming::artifact_stem;
use super::thumbnail::{placeholder_path, ThumbnailGenerator};

/// Result of a file whose decode succeeded.
#[derive(Debug)]
pub enum FileOutcome {
    /// Every artifact was written and the cache updated. Carries the row this
    /// replaced when its hash differs, so its artifacts can be reaped.
    Complete {
        superseded: Option<InvalidCacheEntry>,
    },
    /// At least one artifact failed; nothing was recorded and the file is
    /// retried on the next run.
    Partial { errors: Vec<PipelineError> },
}

/// Runs the pipeline for queued files and records successes in the cache.
pub struct ImageProcessor<'a> {
    config: &'a Config,
    paths: &'a ResolvedPaths,
    cache: &'a CacheStore,
    codec: Arc<dyn ImageCodec>,
    options: EncodeOptions,
}

impl<'a> ImageProcessor<'a> {
    pub fn new(
        config: &'a Config,
        paths: &'a ResolvedPaths,
        cache: &'a CacheStore,
        codec: Arc<dyn ImageCodec>,
    ) -> Self {
        Self {
            config,
            paths,
            cache,
            codec,
            options: EncodeOptions::from_config(config),
        }
    }

    /// Process one file end to end.
    ///
    /// Errors before decoding completes are returned as `Err`. Once decoded,
    /// the original copy, placeholder and variants all run; their failures are
    /// collected into [`FileOutcome::Partial`] without stopping each other.
    pub async fn process(&self, record: &ImageFileRecord) -> PipelineResult<FileOutcome> {
        let path = record.path.as_path();
        tracing::debug!("Processing: {:?}", path);

        let mtime = file_mtime(path).await;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PipelineError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let image_hash = Hasher::content_hash_from_bytes(&bytes);

        let bytes = Arc::new(bytes);
        let decoded = {
            let bytes = Arc::clone(&bytes);
            self.blocking(path, move |codec| codec.decode(&bytes))
                .await?
                .map_err(|e| PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
        };
        if decoded.width == 0 {
            return Err(PipelineError::MissingWidth {
                path: path.to_path_buf(),
            });
        }
        tracing::trace!("  Decoded {}x{}", decoded.width, decoded.height);

        let stem = artifact_stem(&image_hash, &record.unique_name);
        let format = EncodeFormat::for_source(&record.image_type);

        let (original, thumbnail, variants) = join3(
            self.write_original(record, &decoded, bytes, &stem, format),
            self.write_thumbnail(record, &decoded),
            join_all(
                variant_sizes(&self.config.optimised_image_sizes, decoded.width)
                    .map(|size| self.write_variant(path, &decoded, size, &stem, format)),
            ),
        )
        .await;

        let errors: Vec<PipelineError> = std::iter::once(original)
            .chain(std::iter::once(thumbnail))
            .chain(variants)
            .filter_map(Result::err)
            .collect();
        if !errors.is_empty() {
            return Ok(FileOutcome::Partial { errors });
        }

        let entry = ContentCacheEntry {
            image_hash: image_hash.clone(),
            width: Some(decoded.width),
            height: Some(decoded.height),
            original_file_type: Some(record.image_type.clone()),
        };
        let previous = self.cache.upsert_content(&record.unique_name, entry);
        if let Some(mtime) = mtime {
            self.cache.set_fast_mtime(&record.unique_name, mtime);
        }

        tracing::debug!("Processed {:?} ({}x{})", path, decoded.width, decoded.height);

        let superseded = previous
            .filter(|old| old.image_hash != image_hash)
            .map(|old| InvalidCacheEntry {
                unique_name: record.unique_name.clone(),
                image_hash: old.image_hash,
            });
        Ok(FileOutcome::Complete { superseded })
    }

    /// Copy (or re-encode) the original into the public output tree.
    async fn write_original(
        &self,
        record: &ImageFileRecord,
        decoded: &DecodedImage,
        bytes: Arc<Vec<u8>>,
        stem: &str,
        format: EncodeFormat,
    ) -> PipelineResult<()> {
        if !self.config.move_original_image_to_public {
            return Ok(());
        }
        let path = record.path.as_path();
        let dir = self.paths.original_dir();

        if self.config.compress_original_image {
            let image = decoded.clone();
            let options = self.options;
            let encoded = self
                .blocking(path, move |codec| codec.encode(&image, format, &options))
                .await?
                .map_err(|e| encode_error(path, "original", e))?;
            let target = dir.join(format!("{stem}.{}", format.extension()));
            write_artifact(&target, &encoded).await
        } else {
            let target = dir.join(format!("{stem}.{}", record.image_type));
            write_artifact(&target, &bytes).await
        }
    }

    /// Generate and persist the placeholder.
    async fn write_thumbnail(
        &self,
        record: &ImageFileRecord,
        decoded: &DecodedImage,
    ) -> PipelineResult<()> {
        let path = record.path.as_path();
        let generator = ThumbnailGenerator::new(self.config.thumbnail_size);
        let image = decoded.clone();
        let options = self.options;
        let placeholder = self
            .blocking(path, move |codec| generator.generate(codec, &image, &options))
            .await?
            .map_err(|e| encode_error(path, "thumbnail", e))?;

        let json =
            serde_json::to_vec(&placeholder).map_err(|e| encode_error(path, "thumbnail", e))?;
        let target = placeholder_path(&self.paths.thumbnail_dir, &record.unique_name);
        write_artifact(&target, &json).await
    }

    /// Resize to one target width and write the variant.
    async fn write_variant(
        &self,
        path: &Path,
        decoded: &DecodedImage,
        size: u32,
        stem: &str,
        format: EncodeFormat,
    ) -> PipelineResult<()> {
        let image = decoded.clone();
        let options = self.options;
        let encoded = self
            .blocking(path, move |codec| {
                let resized = codec.resize(&image, size)?;
                codec.encode(&resized, format, &options)
            })
            .await?
            .map_err(|e| encode_error(path, &size.to_string(), e))?;

        let target = self
            .paths
            .variant_dir(size)
            .join(format!("{stem}.{}", format.extension()));
        write_artifact(&target, &encoded).await
    }

    /// Run codec work on the blocking pool.
    async fn blocking<T, F>(&self, path: &Path, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&dyn ImageCodec) -> T + Send + 'static,
        T: Send + 'static,
    {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || f(codec.as_ref()))
            .await
            .map_err(|e| PipelineError::Task {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// Configured sizes strictly below the intrinsic width, in configured order.
pub fn variant_sizes(sizes: &[u32], width: u32) -> impl Iterator<Item = u32> + '_ {
    sizes.iter().copied().filter(move |&size| size < width)
}

fn encode_error(path: &Path, stage: &str, error: impl std::fmt::Display) -> PipelineError {
    PipelineError::Encode {
        path: path.to_path_buf(),
        stage: stage.to_string(),
        message: error.to_string(),
    }
}

async fn write_artifact(target: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let write_error = |source| PipelineError::Write {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(target, bytes).await.map_err(write_error)
}
