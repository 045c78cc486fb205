//! Source image discovery.

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::naming::{normalize_path, normalize_type, unique_name};
use crate::config::{Config, ResolvedPaths};
use crate::error::ConfigError;
use crate::types::ImageFileRecord;

/// Discovers image files below the configured base directory.
pub struct FileDiscovery {
    pattern: Regex,
    excluded: HashSet<PathBuf>,
    project_root: PathBuf,
}

impl FileDiscovery {
    /// Build a scanner from resolved configuration.
    ///
    /// Fails before touching the filesystem when no format is accepted.
    /// Generated trees (output root, placeholder store, cache directory) are
    /// always excluded in addition to the configured directories.
    pub fn new(config: &Config, paths: &ResolvedPaths) -> Result<Self, ConfigError> {
        let pattern = extension_pattern(&config.image_formats)?;
        let excluded = paths
            .excluded
            .iter()
            .chain([&paths.output_root, &paths.meta_root, &paths.cache_dir])
            .map(|p| normalize_path(p))
            .collect();
        Ok(Self {
            pattern,
            excluded,
            project_root: paths.project_root.clone(),
        })
    }

    /// Recursively find every accepted image under `base`.
    ///
    /// Excluded directories are pruned without being traversed.
    pub fn discover(&self, base: &Path) -> Vec<ImageFileRecord> {
        let base = normalize_path(base);
        let mut files = Vec::new();

        let walker = WalkDir::new(&base)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && self.is_excluded(entry.path())));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry during scan: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_supported(entry.path()) {
                continue;
            }
            if let Some(record) = self.record(entry.path()) {
                files.push(record);
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!("Discovered {} image(s) under {:?}", files.len(), base);
        files
    }

    /// Check if a file has an accepted extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.pattern.is_match(name))
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        self.excluded.contains(&normalize_path(dir))
    }

    fn record(&self, path: &Path) -> Option<ImageFileRecord> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let extension = path.extension()?.to_string_lossy();
        Some(ImageFileRecord {
            path: path.to_path_buf(),
            image_type: normalize_type(&extension),
            unique_name: unique_name(path, &self.project_root),
            file_name,
        })
    }
}

/// One case-insensitive alternation over the accepted extensions, anchored
/// after the final dot. `jpg` and `jpeg` both match either spelling.
pub fn extension_pattern(formats: &[String]) -> Result<Regex, ConfigError> {
    let mut alternatives: Vec<String> = formats
        .iter()
        .map(|f| f.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|f| !f.is_empty())
        .map(|f| match f.as_str() {
            "jpg" | "jpeg" => "jpe?g".to_string(),
            _ => regex::escape(&f),
        })
        .collect();
    alternatives.sort();
    alternatives.dedup();

    if alternatives.is_empty() {
        return Err(ConfigError::NoImageFormats);
    }

    let pattern = format!(r"(?i)\.(?:{})$", alternatives.join("|"));
    Regex::new(&pattern).map_err(|e| ConfigError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn scanner(root: &Path, config: &Config) -> FileDiscovery {
        FileDiscovery::new(config, &config.resolve(root)).unwrap()
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_extension_pattern_folds_jpeg() {
        let re = extension_pattern(&formats(&["jpg", "png"])).unwrap();
        assert!(re.is_match("a.jpg"));
        assert!(re.is_match("a.JPEG"));
        assert!(re.is_match("a.Png"));
        assert!(!re.is_match("a.webp"));
        assert!(!re.is_match("a.png.bak"));
        assert!(!re.is_match("png"));
    }

    #[test]
    fn test_extension_pattern_rejects_empty_set() {
        assert!(matches!(
            extension_pattern(&[]),
            Err(ConfigError::NoImageFormats)
        ));
        assert!(matches!(
            extension_pattern(&formats(&[" "])),
            Err(ConfigError::NoImageFormats)
        ));
    }

    #[test]
    fn test_zero_formats_fails_before_io() {
        let mut config = Config::default();
        config.image_formats.clear();
        let paths = config.resolve(Path::new("/does/not/exist"));
        assert!(matches!(
            FileDiscovery::new(&config, &paths),
            Err(ConfigError::NoImageFormats)
        ));
    }

    #[test]
    fn test_discover_filters_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("nested/b.JPG"));
        touch(&dir.path().join("notes.txt"));

        let config = Config::default();
        let files = scanner(dir.path(), &config).discover(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "a.png");
        assert_eq!(files[0].image_type, "png");
        assert_eq!(files[1].image_type, "jpeg");
        assert!(files[1].unique_name.ends_with("-b"));
    }

    #[test]
    fn test_discover_prunes_excluded_and_generated_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("keep/a.png"));
        touch(&dir.path().join("drafts/deep/b.png"));
        touch(&dir.path().join("public/images/640/c.png"));
        touch(&dir.path().join(".lumen/cache/d.png"));

        let mut config = Config::default();
        config.excluded_directories = vec![PathBuf::from("drafts/")];
        let files = scanner(dir.path(), &config).discover(dir.path());
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png"]);
    }

    #[test]
    fn test_unique_name_matches_naming_rule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img/logo.png");
        touch(&path);

        let config = Config::default();
        let files = scanner(dir.path(), &config).discover(dir.path());
        assert_eq!(files[0].unique_name, unique_name(Path::new("img/logo.png"), dir.path()));
    }
}
