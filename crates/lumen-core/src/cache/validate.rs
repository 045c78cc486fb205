//! Per-file skip-vs-process decision.
//!
//! The fast tier answers most checks from a single `stat`. Only when the
//! modification time is unknown or has moved does the validator hash the
//! file and compare against the authoritative content-hash tier, which keeps
//! fresh checkouts and CI runs (where every mtime changes) correct.

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use super::CacheStore;
use crate::pipeline::Hasher;
use crate::types::ImageFileRecord;

/// Why a file was judged valid or not. Only [`CacheStatus::is_hit`] matters
/// to the pipeline; the variants exist for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Content cache empty: first run, nothing looked up
    ColdStart,
    /// Fast tier holds the current modification time
    FastHit,
    /// Content hash unchanged (fast tier backfilled)
    HashHit,
    /// No content row for this file
    NoRecord,
    /// Content hash changed
    HashMiss,
    /// File could not be inspected; the pipeline will report why
    Unreadable,
}

impl CacheStatus {
    pub fn is_hit(self) -> bool {
        matches!(self, CacheStatus::FastHit | CacheStatus::HashHit)
    }
}

/// Decides, per scanned file, whether the cache already covers it.
pub struct CacheValidator<'a> {
    cache: &'a CacheStore,
}

impl<'a> CacheValidator<'a> {
    pub fn new(cache: &'a CacheStore) -> Self {
        Self { cache }
    }

    /// Check one file against both tiers.
    pub async fn check(&self, record: &ImageFileRecord) -> CacheStatus {
        if self.cache.content_is_empty() {
            return CacheStatus::ColdStart;
        }

        let mtime = match tokio::fs::metadata(&record.path).await {
            Ok(meta) => modified_nanos(&meta),
            Err(e) => {
                tracing::debug!("Cannot stat {:?}: {e}", record.path);
                return CacheStatus::Unreadable;
            }
        };

        // A fast row only counts while the content row it shortcuts exists
        let Some(entry) = self.cache.content_entry(&record.unique_name) else {
            return CacheStatus::NoRecord;
        };

        if let Some(mtime) = mtime {
            if self.cache.fast_mtime(&record.unique_name) == Some(mtime) {
                return CacheStatus::FastHit;
            }
        }

        let current = match Hasher::content_hash(&record.path).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::debug!("Cannot hash {:?}: {e}", record.path);
                return CacheStatus::Unreadable;
            }
        };

        if current == entry.image_hash {
            if let Some(mtime) = mtime {
                self.cache.set_fast_mtime(&record.unique_name, mtime);
            }
            CacheStatus::HashHit
        } else {
            CacheStatus::HashMiss
        }
    }

    /// Split scanned files into `(queued, cached_count)`.
    pub async fn partition(&self, records: Vec<ImageFileRecord>) -> (Vec<ImageFileRecord>, usize) {
        let mut queued = Vec::new();
        let mut cached = 0usize;
        for record in records {
            let status = self.check(&record).await;
            tracing::trace!("{}: {:?}", record.unique_name, status);
            if status.is_hit() {
                cached += 1;
            } else {
                queued.push(record);
            }
        }
        (queued, cached)
    }
}

/// Modification time in nanoseconds since the UNIX epoch, if the platform
/// reports one.
pub fn modified_nanos(meta: &Metadata) -> Option<u64> {
    let modified = meta.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since_epoch.as_nanos()).ok()
}

/// Read a file's modification time, see [`modified_nanos`].
pub async fn file_mtime(path: &Path) -> Option<u64> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    modified_nanos(&meta)
}
