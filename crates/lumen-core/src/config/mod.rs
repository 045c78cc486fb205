//! Configuration management for Lumen.
//!
//! Configuration is loaded once per invocation from `lumen.toml` in the
//! project root (or an explicit path), validated, and then resolved into
//! absolute [`ResolvedPaths`]. Components receive both by reference and never
//! re-read configuration afterwards.

mod paths;
mod types;
mod validate;

pub use paths::{ResolvedPaths, ORIGINAL_DIR};
pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the project root when no config path is given.
pub const CONFIG_FILE_NAME: &str = "lumen.toml";

/// Root configuration structure for Lumen.
///
/// Keys are camelCase in the TOML file. Unknown keys are rejected so a typo
/// never silently falls back to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Accepted source extensions (`jpg` and `jpeg` are interchangeable)
    pub image_formats: Vec<String>,

    /// Directory scanned for source images
    pub images_base_directory: PathBuf,

    /// Directories pruned from the scan
    pub excluded_directories: Vec<PathBuf>,

    /// Width of the low-fidelity placeholder in pixels
    pub thumbnail_size: u32,

    /// Target widths of the resized variants
    pub optimised_image_sizes: Vec<u32>,

    /// Lossy encoder quality (1-100)
    pub optimised_image_colour_quality: u8,

    /// Lossless encoder compression level (0-9)
    pub optimised_image_compression_level: u8,

    /// Re-encode the original instead of copying its bytes
    pub compress_original_image: bool,

    /// Copy the original into the public output tree
    pub move_original_image_to_public: bool,

    /// Root of the site's static public files
    pub application_public_directory: PathBuf,

    /// Directory holding the placeholder thumbnail store
    pub static_image_meta_directory: PathBuf,

    /// Output root below the public directory, also the URL prefix
    pub optimised_images_directory: String,

    /// Directory holding the persisted cache stores
    pub cache_directory: PathBuf,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_formats: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "webp".to_string(),
            ],
            images_base_directory: PathBuf::from("."),
            excluded_directories: vec![
                PathBuf::from("node_modules"),
                PathBuf::from(".git"),
                PathBuf::from("public"),
            ],
            thumbnail_size: 20,
            optimised_image_sizes: vec![640, 960, 1280, 1920],
            optimised_image_colour_quality: 80,
            optimised_image_compression_level: 6,
            compress_original_image: false,
            move_original_image_to_public: true,
            application_public_directory: PathBuf::from("public"),
            static_image_meta_directory: PathBuf::from(".lumen/meta"),
            optimised_images_directory: "images".to_string(),
            cache_directory: PathBuf::from(".lumen/cache"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration for a project.
    ///
    /// An explicit `path` must exist. Without one, `lumen.toml` in the
    /// project root is used if present, otherwise the defaults.
    pub fn load(project_root: &Path, path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path(project_root);
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path for a project.
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE_NAME)
    }

    /// Resolve every configured directory against the project root.
    pub fn resolve(&self, project_root: &Path) -> ResolvedPaths {
        ResolvedPaths::resolve(self, project_root)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
