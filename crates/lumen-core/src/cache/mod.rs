//! Two-tier incremental cache.
//!
//! Three independent JSON stores live in the cache directory:
//!
//! - **content-hash cache** (`content-hash-cache.json`): `unique_name` →
//!   `{ imageHash, width, height, originalFileType }`. Authoritative: a row
//!   exists only for images that were fully processed.
//! - **local fast cache** (`local-cache.json`): `unique_name` → modification
//!   time. Pure optimization in front of the content-hash cache; it may be
//!   empty or stale without any loss of correctness.
//! - **config cache** (`config-cache.json`): the hash of the configuration
//!   the artifacts were produced with.
//!
//! A [`CacheStore`] is constructed once per invocation, passed by reference
//! to every component and flushed once after the batch settles. The batch
//! runs on a single cooperative thread, so the stores use `RefCell`; no
//! borrow is ever held across an `.await`.

mod entry;
pub mod gate;
mod store;
pub mod validate;

pub use entry::{
    ConfigCacheRecord, ContentCache, ContentCacheEntry, InvalidCacheEntry, LocalCache,
};
pub use gate::ConfigGate;
pub use store::JsonStore;
pub use validate::{CacheStatus, CacheValidator};

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::types::ImageFileRecord;

pub const CONTENT_CACHE_FILE: &str = "content-hash-cache.json";
pub const LOCAL_CACHE_FILE: &str = "local-cache.json";
pub const CONFIG_CACHE_FILE: &str = "config-cache.json";

/// Owner of every cache tier for one invocation.
pub struct CacheStore {
    content: RefCell<JsonStore<ContentCache>>,
    local: RefCell<JsonStore<LocalCache>>,
    config: RefCell<JsonStore<ConfigCacheRecord>>,
}

impl CacheStore {
    /// Open the stores in `cache_dir`. Missing or corrupt stores start empty.
    ///
    /// Fast rows without a content row are dropped, so a discarded content
    /// store never leaves files looking cached.
    pub fn open(cache_dir: &Path) -> Self {
        let store = Self {
            content: RefCell::new(JsonStore::load(cache_dir.join(CONTENT_CACHE_FILE))),
            local: RefCell::new(JsonStore::load(cache_dir.join(LOCAL_CACHE_FILE))),
            config: RefCell::new(JsonStore::load(cache_dir.join(CONFIG_CACHE_FILE))),
        };
        store.prune_orphan_fast_rows();
        store
    }

    fn prune_orphan_fast_rows(&self) {
        let content = self.content.borrow();
        let mut local = self.local.borrow_mut();
        let orphans: Vec<String> = local
            .get()
            .keys()
            .filter(|name| !content.get().contains_key(name.as_str()))
            .cloned()
            .collect();
        if orphans.is_empty() {
            return;
        }
        tracing::debug!("Dropping {} fast cache row(s) with no content row", orphans.len());
        let rows = local.modify();
        for name in orphans {
            rows.remove(&name);
        }
    }

    /// Read the persisted content-hash cache without opening the other tiers.
    pub fn load_content(cache_dir: &Path) -> ContentCache {
        JsonStore::<ContentCache>::load(cache_dir.join(CONTENT_CACHE_FILE))
            .get()
            .clone()
    }

    // ── content-hash tier ─────────────────────────────────────────────────

    pub fn content_is_empty(&self) -> bool {
        self.content.borrow().get().is_empty()
    }

    pub fn content_len(&self) -> usize {
        self.content.borrow().get().len()
    }

    pub fn content_entry(&self, unique_name: &str) -> Option<ContentCacheEntry> {
        self.content.borrow().get().get(unique_name).cloned()
    }

    /// Insert or replace a content row, returning the row it replaced.
    pub fn upsert_content(
        &self,
        unique_name: &str,
        entry: ContentCacheEntry,
    ) -> Option<ContentCacheEntry> {
        let mut content = self.content.borrow_mut();
        if let Some(existing) = content.get().get(unique_name) {
            if *existing == entry {
                return Some(entry);
            }
        }
        content.modify().insert(unique_name.to_string(), entry)
    }

    // ── fast tier ─────────────────────────────────────────────────────────

    pub fn fast_mtime(&self, unique_name: &str) -> Option<u64> {
        self.local.borrow().get().get(unique_name).copied()
    }

    pub fn set_fast_mtime(&self, unique_name: &str, mtime: u64) {
        let mut local = self.local.borrow_mut();
        if local.get().get(unique_name) != Some(&mtime) {
            local.modify().insert(unique_name.to_string(), mtime);
        }
    }

    // ── config tier ───────────────────────────────────────────────────────

    pub fn previous_config_hash(&self) -> Option<String> {
        self.config.borrow().get().previous_config_hash.clone()
    }

    pub fn set_config_hash(&self, hash: &str) {
        let mut config = self.config.borrow_mut();
        if config.get().previous_config_hash.as_deref() != Some(hash) {
            config.modify().previous_config_hash = Some(hash.to_string());
        }
    }

    // ── cross-tier ────────────────────────────────────────────────────────

    /// Remove both the content and fast rows of one image.
    pub fn remove(&self, unique_name: &str) {
        let mut content = self.content.borrow_mut();
        if content.get().contains_key(unique_name) {
            content.modify().remove(unique_name);
        }
        let mut local = self.local.borrow_mut();
        if local.get().contains_key(unique_name) {
            local.modify().remove(unique_name);
        }
    }

    /// Empty both image tiers. The config row is left to the gate.
    pub fn clear_images(&self) {
        let mut content = self.content.borrow_mut();
        if !content.get().is_empty() {
            content.modify().clear();
        }
        let mut local = self.local.borrow_mut();
        if !local.get().is_empty() {
            local.modify().clear();
        }
    }

    /// Content rows whose `unique_name` is not among the scanned files.
    pub fn invalid_entries(&self, scanned: &[ImageFileRecord]) -> Vec<InvalidCacheEntry> {
        let present: HashSet<&str> = scanned.iter().map(|r| r.unique_name.as_str()).collect();
        self.content
            .borrow()
            .get()
            .iter()
            .filter(|(name, _)| !present.contains(name.as_str()))
            .map(|(name, entry)| InvalidCacheEntry {
                unique_name: name.clone(),
                image_hash: entry.image_hash.clone(),
            })
            .collect()
    }

    /// Whether any tier changed since it was loaded.
    pub fn is_dirty(&self) -> bool {
        self.content.borrow().is_dirty()
            || self.local.borrow().is_dirty()
            || self.config.borrow().is_dirty()
    }

    /// Persist every changed tier. Returns how many store files were written.
    pub fn flush(&self) -> Result<usize, CacheError> {
        let mut written = 0;
        written += usize::from(self.content.borrow_mut().flush()?);
        written += usize::from(self.local.borrow_mut().flush()?);
        written += usize::from(self.config.borrow_mut().flush()?);
        if written > 0 {
            tracing::debug!("Flushed {written} cache store(s)");
        }
        Ok(written)
    }

    /// Paths of the three store files in `cache_dir`.
    pub fn store_paths(cache_dir: &Path) -> [PathBuf; 3] {
        [
            cache_dir.join(CONTENT_CACHE_FILE),
            cache_dir.join(LOCAL_CACHE_FILE),
            cache_dir.join(CONFIG_CACHE_FILE),
        ]
    }
}
