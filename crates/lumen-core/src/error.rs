//! Error types for the Lumen asset pipeline.
//!
//! Errors are organized by component so each failure carries the context it
//! is logged with (file paths, image types, the store that failed to parse).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-file pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// An error escaped the batch itself rather than a single file
    #[error("Batch failed while {context}: {source}")]
    Batch {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors. All of these are fatal and raised before
/// any filesystem work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration (includes unknown keys)
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// No image formats are accepted, so nothing could ever be discovered
    #[error("Invalid configuration: imageFormats must list at least one extension")]
    NoImageFormats,
}

/// Per-file pipeline errors. One of these fails a single image, never the batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Decoded image reports no usable width
    #[error("Cannot determine width of {path}")]
    MissingWidth { path: PathBuf },

    /// Resizing or re-encoding failed
    #[error("Encode error for {path} ({stage}): {message}")]
    Encode {
        path: PathBuf,
        stage: String,
        message: String,
    },

    /// A generated artifact could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking codec task panicked or was cancelled
    #[error("Codec task failed for {path}: {message}")]
    Task { path: PathBuf, message: String },
}

/// Cache store errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A persisted store exists but does not parse
    #[error("Cache store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A store could not be read or written
    #[error("Cache store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while hydrating document image references.
#[derive(Error, Debug)]
pub enum HydrateError {
    /// The referenced image has no content-hash cache row
    #[error("No cached image for reference {reference:?} (resolved to {unique_name})")]
    Unresolved {
        reference: String,
        unique_name: String,
    },

    /// The image is cached but no derivative covers it
    #[error("No generated derivative for {reference:?}")]
    NoDerivative { reference: String },
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
