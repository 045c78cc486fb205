//! Core data types shared across pipeline stages.

use std::path::PathBuf;
use std::time::Duration;

/// A source image found by the scanner. Rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFileRecord {
    /// Absolute path to the source file
    pub path: PathBuf,

    /// Just the filename portion
    pub file_name: String,

    /// Normalized image type ("jpeg", "png", "webp", ...)
    pub image_type: String,

    /// Primary cache key, see [`crate::pipeline::naming::unique_name`]
    pub unique_name: String,
}

/// Outcome of one full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Images found by the scanner
    pub total_images_found: usize,

    /// Images skipped because the cache already covered them
    pub total_images_cached: usize,

    /// Images fully processed this run
    pub processed: usize,

    /// Images whose pipeline failed (logged, retried next run)
    pub failed: usize,

    /// Stale cache rows removed by the reaper
    pub reaped: usize,

    /// Whether the config hash gate forced a cold run
    pub config_changed: bool,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Receives progress updates while a batch runs.
///
/// The core only counts; rendering (a progress bar, a log line) is up to the
/// caller.
pub trait ProgressReporter {
    /// Called once with the number of queued files before processing starts.
    fn start(&self, _total: u64) {}

    /// Called once per file whose pipeline reached the end.
    fn advance(&self, _processed: u64) {}

    /// Called when the batch settles, successfully or not.
    fn finish(&self) {}
}

/// A reporter that ignores every update.
pub struct NoProgress;

impl ProgressReporter for NoProgress {}
