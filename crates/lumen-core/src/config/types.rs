//! Sub-configuration structs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,

    /// File that every warning and error is appended to
    pub error_log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            error_log_file: PathBuf::from(".lumen/errors.log"),
        }
    }
}

/// Log levels accepted in `logging.level`.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Log formats accepted in `logging.format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];
