//! Removal of cache rows and artifacts that no longer have a source.

use std::io::ErrorKind;
use std::path::Path;

use crate::cache::{CacheStore, InvalidCacheEntry};
use crate::config::{ResolvedPaths, ORIGINAL_DIR};
use crate::error::Result;

use super::naming::artifact_stem;
use super::thumbnail::placeholder_path;

/// Deletes what stale and superseded cache entries left behind.
pub struct Reaper<'a> {
    cache: &'a CacheStore,
    paths: &'a ResolvedPaths,
}

impl<'a> Reaper<'a> {
    pub fn new(cache: &'a CacheStore, paths: &'a ResolvedPaths) -> Self {
        Self { cache, paths }
    }

    /// Remove rows, artifacts and placeholders of sources that are gone.
    ///
    /// Rows are dropped first; file deletion is best-effort. Returns the
    /// number of entries reaped.
    pub async fn reap(&self, entries: &[InvalidCacheEntry]) -> usize {
        for entry in entries {
            tracing::info!("Removing stale image {}", entry.unique_name);
            self.cache.remove(&entry.unique_name);
            let stem = artifact_stem(&entry.image_hash, &entry.unique_name);
            remove_artifacts(&self.paths.output_root, &stem).await;
            remove_file(&placeholder_path(
                &self.paths.thumbnail_dir,
                &entry.unique_name,
            ))
            .await;
        }
        entries.len()
    }

    /// Remove the artifacts of a previous version of a re-processed image.
    ///
    /// Rows and the placeholder belong to the current version and are kept.
    pub async fn remove_superseded(&self, entries: &[InvalidCacheEntry]) -> usize {
        let mut removed = 0;
        for entry in entries {
            let stem = artifact_stem(&entry.image_hash, &entry.unique_name);
            removed += remove_artifacts(&self.paths.output_root, &stem).await;
        }
        if removed > 0 {
            tracing::debug!("Removed {removed} superseded artifact(s)");
        }
        removed
    }
}

/// Delete every file named `{stem}.*` in the immediate subdirectories of
/// `output_root`. Returns how many files were deleted.
pub async fn remove_artifacts(output_root: &Path, stem: &str) -> usize {
    let mut dirs = match tokio::fs::read_dir(output_root).await {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("Cannot list {:?}: {e}", output_root);
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(dir)) = dirs.next_entry().await {
        if !dir.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let Ok(mut files) = tokio::fs::read_dir(dir.path()).await else {
            continue;
        };
        while let Ok(Some(file)) = files.next_entry().await {
            let path = file.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(stem) && remove_file(&path).await
            {
                removed += 1;
            }
        }
    }
    removed
}

/// Delete every generated artifact directory.
///
/// Only the directories the pipeline itself creates are removed: numeric
/// size directories and `original/` below the output root, numeric
/// placeholder directories below the meta root. Anything else living next
/// to them is left alone.
pub async fn purge_artifacts(paths: &ResolvedPaths) {
    let is_size = |name: &str| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit());
    purge_subdirs(&paths.output_root, |name| is_size(name) || name == ORIGINAL_DIR).await;
    purge_subdirs(&paths.meta_root, is_size).await;
}

async fn purge_subdirs(root: &Path, generated: impl Fn(&str) -> bool) {
    let mut dirs = match tokio::fs::read_dir(root).await {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!("Cannot list {:?}: {e}", root);
            return;
        }
    };
    while let Ok(Some(dir)) = dirs.next_entry().await {
        let name = dir.file_name();
        let is_generated = name.to_str().is_some_and(|n| generated(n));
        if !is_generated || !dir.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let path = dir.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!("Removed {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Cannot remove {:?}: {e}", path),
        }
    }
}

/// Delete every persisted cache store and generated artifact.
pub async fn clear_all(paths: &ResolvedPaths) -> Result<()> {
    paths.validate()?;
    for store in CacheStore::store_paths(&paths.cache_dir) {
        match tokio::fs::remove_file(&store).await {
            Ok(()) => tracing::debug!("Removed {:?}", store),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    purge_artifacts(paths).await;
    Ok(())
}

/// Remove one file. Missing files are not an error.
async fn remove_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Cannot remove {:?}: {e}", path);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentCacheEntry;
    use crate::config::Config;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    fn row(hash: &str) -> ContentCacheEntry {
        ContentCacheEntry {
            image_hash: hash.into(),
            width: Some(100),
            height: Some(50),
            original_file_type: Some("png".into()),
        }
    }

    #[tokio::test]
    async fn test_reap_removes_rows_and_artifacts_only_for_stale() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Config::default().resolve(dir.path());
        let cache = CacheStore::open(&paths.cache_dir);
        cache.upsert_content("a-gone", row("h1"));
        cache.set_fast_mtime("a-gone", 1);
        cache.upsert_content("b-kept", row("h2"));

        let gone = [
            paths.variant_dir(640).join("h1a-gone.png"),
            paths.original_dir().join("h1a-gone.png"),
            paths.thumbnail_dir.join("a-gone.json"),
        ];
        let kept = [
            paths.variant_dir(640).join("h2b-kept.png"),
            paths.thumbnail_dir.join("b-kept.json"),
        ];
        gone.iter().chain(kept.iter()).for_each(|p| touch(p));

        let reaped = Reaper::new(&cache, &paths)
            .reap(&[InvalidCacheEntry {
                unique_name: "a-gone".into(),
                image_hash: "h1".into(),
            }])
            .await;

        assert_eq!(reaped, 1);
        assert!(cache.content_entry("a-gone").is_none());
        assert!(cache.fast_mtime("a-gone").is_none());
        assert!(cache.content_entry("b-kept").is_some());
        assert!(gone.iter().all(|p| !p.exists()));
        assert!(kept.iter().all(|p| p.exists()));
    }

    #[tokio::test]
    async fn test_reap_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Config::default().resolve(dir.path());
        let cache = CacheStore::open(&paths.cache_dir);
        cache.upsert_content("a", row("h"));

        let reaped = Reaper::new(&cache, &paths)
            .reap(&[InvalidCacheEntry {
                unique_name: "a".into(),
                image_hash: "h".into(),
            }])
            .await;
        assert_eq!(reaped, 1);
        assert!(cache.content_is_empty());
    }

    #[tokio::test]
    async fn test_superseded_keeps_rows_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Config::default().resolve(dir.path());
        let cache = CacheStore::open(&paths.cache_dir);
        cache.upsert_content("a", row("new"));
        let old = paths.variant_dir(640).join("olda.jpg");
        let current = paths.variant_dir(640).join("newa.jpg");
        let placeholder = paths.thumbnail_dir.join("a.json");
        [&old, &current, &placeholder].iter().for_each(|p| touch(p));

        let removed = Reaper::new(&cache, &paths)
            .remove_superseded(&[InvalidCacheEntry {
                unique_name: "a".into(),
                image_hash: "old".into(),
            }])
            .await;

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(current.exists());
        assert!(placeholder.exists());
        assert!(cache.content_entry("a").is_some());
    }

    #[tokio::test]
    async fn test_clear_all_removes_stores_and_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Config::default().resolve(dir.path());
        let cache = CacheStore::open(&paths.cache_dir);
        cache.upsert_content("a", row("h"));
        cache.set_config_hash("cfg");
        cache.flush().unwrap();
        touch(&paths.variant_dir(640).join("ha.png"));
        touch(&paths.thumbnail_dir.join("a.json"));

        clear_all(&paths).await.unwrap();
        assert!(CacheStore::store_paths(&paths.cache_dir)
            .iter()
            .all(|p| !p.exists()));
        assert!(!paths.variant_dir(640).exists());
        assert!(!paths.thumbnail_dir.exists());

        // Clearing twice is fine
        clear_all(&paths).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_leaves_unrelated_files_in_output_roots() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Config::default().resolve(dir.path());
        let generated = [
            paths.variant_dir(640).join("ha.png"),
            paths.variant_dir(3000).join("ha.png"),
            paths.original_dir().join("ha.png"),
            paths.thumbnail_dir.join("a.json"),
            paths.meta_root.join("32").join("a.json"),
        ];
        let unrelated = [
            paths.output_root.join("logo.svg"),
            paths.output_root.join("icons").join("x.png"),
            paths.meta_root.join("notes.md"),
            paths.meta_root.join("drafts").join("a.json"),
        ];
        generated.iter().chain(unrelated.iter()).for_each(|p| touch(p));

        purge_artifacts(&paths).await;
        assert!(generated.iter().all(|p| !p.exists()));
        assert!(unrelated.iter().all(|p| p.exists()));
    }

    #[tokio::test]
    async fn test_clear_all_refuses_layout_over_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.static_image_meta_directory = ".".into();
        let paths = config.resolve(dir.path());
        let source = dir.path().join("20").join("keep.png");
        touch(&source);

        let err = clear_all(&paths).await.unwrap_err();
        assert!(matches!(err, crate::LumenError::Config(_)));
        assert!(source.exists());
    }
}
