//! Absolute directory layout derived from a [`Config`].

use std::path::{Path, PathBuf};

use super::Config;
use crate::error::ConfigError;
use crate::pipeline::naming::normalize_path;

/// Every directory the pipeline touches, resolved once against the project
/// root at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Project root; `unique_name` hashes paths relative to it
    pub project_root: PathBuf,
    /// Directory scanned for source images
    pub images_base: PathBuf,
    /// Directories pruned from the scan
    pub excluded: Vec<PathBuf>,
    /// Root of the site's public files
    pub public_dir: PathBuf,
    /// `{public}/{optimisedImagesDirectory}`: holds `{size}/` and `original/`
    pub output_root: PathBuf,
    /// Root of the placeholder store
    pub meta_root: PathBuf,
    /// `{meta}/{thumbnailSize}`: one placeholder file per image
    pub thumbnail_dir: PathBuf,
    /// Directory holding the persisted cache stores
    pub cache_dir: PathBuf,
    /// Durable warning/error sink
    pub error_log: PathBuf,
    /// URL prefix of the output root, e.g. `/images`
    pub public_url_prefix: String,
}

impl ResolvedPaths {
    pub fn resolve(config: &Config, project_root: &Path) -> Self {
        let project_root = normalize_path(project_root);
        let resolve = |path: &Path| resolve_against(&project_root, path);

        let public_dir = resolve(&config.application_public_directory);
        let output_dir = config.optimised_images_directory.trim_matches('/');
        let meta_root = resolve(&config.static_image_meta_directory);

        Self {
            images_base: resolve(&config.images_base_directory),
            excluded: config
                .excluded_directories
                .iter()
                .map(|dir| resolve(dir))
                .collect(),
            output_root: normalize_path(&public_dir.join(output_dir)),
            thumbnail_dir: meta_root.join(config.thumbnail_size.to_string()),
            public_url_prefix: format!("/{output_dir}"),
            cache_dir: resolve(&config.cache_directory),
            error_log: resolve(&config.logging.error_log_file),
            public_dir,
            meta_root,
            project_root,
        }
    }

    /// Reject layouts where a generated root would swallow user content.
    ///
    /// The output and meta roots are purged on every configuration change,
    /// so neither may equal or contain the project root, the images base or
    /// the cache directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generated = [
            ("optimisedImagesDirectory", &self.output_root),
            ("staticImageMetaDirectory", &self.meta_root),
        ];
        let protected = [
            ("the project root", &self.project_root),
            ("imagesBaseDirectory", &self.images_base),
            ("cacheDirectory", &self.cache_dir),
        ];
        for (key, root) in generated {
            for (name, dir) in protected {
                if dir.starts_with(root) {
                    return Err(ConfigError::ValidationError(format!(
                        "{key} ({}) must not equal or contain {name} ({})",
                        root.display(),
                        dir.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Directory of one size variant, e.g. `{output}/640`.
    pub fn variant_dir(&self, size: u32) -> PathBuf {
        self.output_root.join(size.to_string())
    }

    /// Directory of the public original copies.
    pub fn original_dir(&self) -> PathBuf {
        self.output_root.join(ORIGINAL_DIR)
    }
}

/// Subdirectory of the output root holding original copies.
pub const ORIGINAL_DIR: &str = "original";

/// Expand `~` and anchor relative paths at `root`.
fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(&raw).into_owned());
    if expanded.is_absolute() {
        normalize_path(&expanded)
    } else {
        normalize_path(&root.join(expanded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_layout() {
        let paths = Config::default().resolve(Path::new("/site"));
        assert_eq!(paths.images_base, PathBuf::from("/site"));
        assert_eq!(paths.output_root, PathBuf::from("/site/public/images"));
        assert_eq!(paths.thumbnail_dir, PathBuf::from("/site/.lumen/meta/20"));
        assert_eq!(paths.cache_dir, PathBuf::from("/site/.lumen/cache"));
        assert_eq!(paths.public_url_prefix, "/images");
        assert!(paths.excluded.contains(&PathBuf::from("/site/node_modules")));
    }

    #[test]
    fn test_default_layout_is_valid() {
        assert!(Config::default().resolve(Path::new("/site")).validate().is_ok());
    }

    #[test]
    fn test_meta_root_over_sources_is_rejected() {
        let mut config = Config::default();
        config.images_base_directory = PathBuf::from("content");
        config.static_image_meta_directory = PathBuf::from("content");
        let err = config.resolve(Path::new("/site")).validate().unwrap_err();
        assert!(err.to_string().contains("staticImageMetaDirectory"));

        config.static_image_meta_directory = PathBuf::from(".");
        assert!(config.resolve(Path::new("/site")).validate().is_err());
    }

    #[test]
    fn test_output_root_containing_cache_is_rejected() {
        let mut config = Config::default();
        config.cache_directory = PathBuf::from("public/images/.cache");
        let err = config.resolve(Path::new("/site")).validate().unwrap_err();
        assert!(err.to_string().contains("optimisedImagesDirectory"));
    }

    #[test]
    fn test_public_dir_at_root_is_rejected() {
        let mut config = Config::default();
        config.application_public_directory = PathBuf::from("/");
        config.optimised_images_directory = "site".to_string();
        assert!(config.resolve(Path::new("/site")).validate().is_err());
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let mut config = Config::default();
        config.cache_directory = PathBuf::from("/var/cache/lumen/");
        let paths = config.resolve(Path::new("/site"));
        assert_eq!(paths.cache_dir, PathBuf::from("/var/cache/lumen"));
    }

    #[test]
    fn test_resolve_normalizes_dot_segments() {
        let mut config = Config::default();
        config.images_base_directory = PathBuf::from("./docs/../content/");
        config.optimised_images_directory = "/_img/".to_string();
        let paths = config.resolve(Path::new("/site"));
        assert_eq!(paths.images_base, PathBuf::from("/site/content"));
        assert_eq!(paths.public_url_prefix, "/_img");
        assert_eq!(paths.variant_dir(640), PathBuf::from("/site/public/_img/640"));
        assert_eq!(
            paths.original_dir(),
            PathBuf::from("/site/public/_img/original")
        );
    }
}
