//! Cache row definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content-hash cache row: presence means the image was fully processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCacheEntry {
    /// Short BLAKE3 fingerprint of the source bytes
    pub image_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Normalized source type ("png", "jpeg", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_type: Option<String>,
}

/// The single config-hash row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCacheRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_config_hash: Option<String>,
}

/// A content-cache row with no matching file in the latest scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCacheEntry {
    pub unique_name: String,
    pub image_hash: String,
}

/// `unique_name` → content-hash row.
pub type ContentCache = BTreeMap<String, ContentCacheEntry>;

/// `unique_name` → last observed modification time (ns since the epoch).
pub type LocalCache = BTreeMap<String, u64>;
