//! A single JSON-backed key-value store file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::CacheError;

/// One persisted store: its in-memory value plus a dirty flag so an
/// unchanged store is never rewritten.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    value: T,
    dirty: bool,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Load a store, falling back to an empty value.
    ///
    /// A missing file is a normal cold start. A file that fails to parse is
    /// deleted and the corruption logged.
    pub fn load(path: PathBuf) -> Self {
        let value = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(source) => {
                    let err = CacheError::Corrupt {
                        path: path.clone(),
                        source,
                    };
                    tracing::error!("{err}; discarding it");
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!("Failed to delete corrupt cache store {:?}: {e}", path);
                    }
                    T::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(source) => {
                let err = CacheError::Io {
                    path: path.clone(),
                    source,
                };
                tracing::warn!("{err}; starting from an empty store");
                T::default()
            }
        };

        Self {
            path,
            value,
            dirty: false,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Mutable access to the value. Marks the store dirty, so callers check
    /// for an actual change first.
    pub fn modify(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the store if it changed since it was loaded or last flushed.
    ///
    /// The file is replaced wholesale through a temp file and a rename, so a
    /// crash leaves either the old or the new store on disk.
    /// Returns whether anything was written.
    pub fn flush(&mut self) -> Result<bool, CacheError> {
        if !self.dirty {
            return Ok(false);
        }
        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.value).map_err(|source| {
            CacheError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        self.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    type Map = BTreeMap<String, u64>;

    #[test]
    fn test_load_missing_is_empty_and_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Map> = JsonStore::load(dir.path().join("s.json"));
        assert!(store.get().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_flush_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("s.json");
        let mut store: JsonStore<Map> = JsonStore::load(path.clone());
        store.modify().insert("a".into(), 1);
        assert!(store.flush().unwrap());
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded: JsonStore<Map> = JsonStore::load(path);
        assert_eq!(reloaded.get().get("a"), Some(&1));
    }

    #[test]
    fn test_clean_store_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let mut store: JsonStore<Map> = JsonStore::load(path.clone());
        assert!(!store.flush().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_store_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store: JsonStore<Map> = JsonStore::load(path.clone());
        assert!(store.get().is_empty());
        assert!(!path.exists());
    }
}
