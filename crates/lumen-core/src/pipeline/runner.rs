//! One full incremental run: scan, gate, validate, process, reap, flush.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheStore, CacheValidator, ConfigGate};
use crate::config::{Config, ResolvedPaths};
use crate::error::{LumenError, Result};
use crate::types::{BatchReport, ProgressReporter};

use super::decode::{ImageCodec, RasterCodec};
use super::discovery::FileDiscovery;
use super::processor::{FileOutcome, ImageProcessor};
use super::reaper::Reaper;

/// Batch driver over one project.
pub struct Pipeline<'a> {
    config: &'a Config,
    paths: &'a ResolvedPaths,
    codec: Arc<dyn ImageCodec>,
    parallel: Option<usize>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, paths: &'a ResolvedPaths) -> Self {
        Self {
            config,
            paths,
            codec: Arc::new(RasterCodec),
            parallel: None,
        }
    }

    /// Replace the image codec.
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Cap the number of files processed at once. `None` dispatches the whole
    /// queue.
    pub fn with_parallel(mut self, parallel: Option<usize>) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run the pipeline once.
    ///
    /// Per-file failures are logged and counted in the report. Only
    /// configuration errors, output setup failures and cache write failures
    /// fail the run. Cache stores are flushed in every case.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let start = Instant::now();
        self.paths.validate()?;
        let discovery = FileDiscovery::new(self.config, self.paths)?;
        let gate = ConfigGate::new(self.config)?;
        let cache = CacheStore::open(&self.paths.cache_dir);

        let result = self.run_batch(&discovery, &gate, &cache, progress).await;
        progress.finish();

        let flushed = cache.flush();
        let mut report = match (result, flushed) {
            (Ok(report), Ok(_)) => report,
            (Ok(_), Err(e)) => return Err(e.into()),
            (Err(e), Ok(_)) => return Err(e),
            (Err(e), Err(flush_error)) => {
                tracing::error!("{flush_error}");
                return Err(e);
            }
        };
        report.elapsed = start.elapsed();
        Ok(report)
    }

    async fn run_batch(
        &self,
        discovery: &FileDiscovery,
        gate: &ConfigGate,
        cache: &CacheStore,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let files = discovery.discover(&self.paths.images_base);
        let config_changed = gate.check(cache, self.paths).await;
        let stale = cache.invalid_entries(&files);

        let total_images_found = files.len();
        let (queued, total_images_cached) = CacheValidator::new(cache).partition(files).await;
        tracing::info!(
            "Found {total_images_found} image(s), {total_images_cached} cached, {} to process",
            queued.len()
        );

        for dir in [&self.paths.output_root, &self.paths.thumbnail_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| LumenError::Batch {
                    context: format!("creating {}", dir.display()),
                    source,
                })?;
        }

        progress.start(queued.len() as u64);
        let processor = ImageProcessor::new(self.config, self.paths, cache, Arc::clone(&self.codec));
        let limit = self.parallel.unwrap_or(queued.len()).max(1);

        let outcomes: Vec<_> = stream::iter(&queued)
            .map(|record| {
                let processor = &processor;
                async move {
                    let outcome = processor.process(record).await;
                    // Decoded files count even when an artifact failed
                    if outcome.is_ok() {
                        progress.advance(1);
                    }
                    (record, outcome)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut processed = 0;
        let mut failed = 0;
        let mut superseded = Vec::new();
        for (record, outcome) in outcomes {
            match outcome {
                Ok(FileOutcome::Complete { superseded: old }) => {
                    processed += 1;
                    superseded.extend(old);
                }
                Ok(FileOutcome::Partial { errors }) => {
                    failed += 1;
                    for e in errors {
                        tracing::error!(
                            path = %record.path.display(),
                            image_type = %record.image_type,
                            "{e}"
                        );
                    }
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        path = %record.path.display(),
                        image_type = %record.image_type,
                        "{e}"
                    );
                }
            }
        }

        let reaper = Reaper::new(cache, self.paths);
        reaper.remove_superseded(&superseded).await;
        let reaped = reaper.reap(&stale).await;

        gate.commit(cache);

        Ok(BatchReport {
            total_images_found,
            total_images_cached,
            processed,
            failed,
            reaped,
            config_changed,
            elapsed: Default::default(),
        })
    }
}
