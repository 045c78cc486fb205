//! Configuration-change invalidation.
//!
//! Every generated artifact depends on the configuration it was produced
//! with, so the gate fingerprints the whole resolved [`Config`] and forces a
//! cold run whenever the fingerprint differs from the one recorded by the
//! last successful run.

use super::CacheStore;
use crate::config::{Config, ResolvedPaths};
use crate::pipeline::reaper::purge_artifacts;

/// Fingerprint of a configuration plus the logic to act on it.
pub struct ConfigGate {
    hash: String,
}

impl ConfigGate {
    pub fn new(config: &Config) -> Result<Self, serde_json::Error> {
        Ok(Self {
            hash: config_hash(config)?,
        })
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Compare against the recorded hash.
    ///
    /// On a mismatch (including no record at all) both image tiers are
    /// cleared and every generated artifact deleted. Returns whether the run
    /// was forced cold.
    pub async fn check(&self, cache: &CacheStore, paths: &ResolvedPaths) -> bool {
        match cache.previous_config_hash() {
            Some(previous) if previous == self.hash => false,
            previous => {
                if previous.is_some() {
                    tracing::warn!(
                        "Configuration changed since the last run. \
                         Clearing caches and regenerating every image."
                    );
                } else {
                    tracing::warn!("No configuration record found. Generating every image.");
                }
                cache.clear_images();
                purge_artifacts(paths).await;
                true
            }
        }
    }

    /// Record this configuration as the one the artifacts now reflect.
    /// Called only after a run completed.
    pub fn commit(&self, cache: &CacheStore) {
        cache.set_config_hash(&self.hash);
    }
}

/// Deterministic BLAKE3 hash of the serialized configuration.
pub fn config_hash(config: &Config) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(config)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
