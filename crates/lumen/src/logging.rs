//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats. Warnings and errors are
//! additionally appended to a durable error log.

use lumen_core::config::LoggingConfig;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for data output)
/// - The RUST_LOG environment variable can override the log level
/// - `verbose` forces DEBUG, `json_logs` forces JSON output
pub fn init(settings: &LoggingConfig, error_log: &Path, verbose: bool, json_logs: bool) {
    let level = if verbose {
        "debug"
    } else {
        settings.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json_format = json_logs || settings.format == "json";

    let stderr_layer = if json_format {
        // JSON format for machine parsing
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        // Pretty format for humans
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .boxed()
    };

    let (error_file, open_error) = match open_error_log(error_log) {
        Ok(file) => (Some(file), None),
        Err(e) => (None, Some(e)),
    };
    let error_layer = error_file.map(|file| {
        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(error_layer)
        .init();

    if let Some(e) = open_error {
        tracing::warn!("Cannot open error log {:?}: {e}", error_log);
    }
}

/// Open the error log for appending, creating its directory.
fn open_error_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
