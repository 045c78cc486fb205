//! Deterministic, filename-safe identifiers for source images.
//!
//! A `unique_name` is `{pathHash}-{stem}`: the short BLAKE3 digest of the
//! image's normalized project-relative path followed by its sanitized file
//! stem. Scanner and hydrator both go through [`unique_name`], so a document
//! reference and a scanned file always agree on the cache key.

use std::path::{Component, Path, PathBuf};

/// Hex characters of the path digest kept in a `unique_name`.
const PATH_HASH_LEN: usize = 10;

/// Lexically normalize a path: drop `.` segments, fold `..` segments and
/// trailing separators. Never touches the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Compute the `unique_name` of an image path.
///
/// Relative paths are anchored at `project_root`; the project-root prefix and
/// all separators are then stripped down to a `/`-joined key so textual
/// variants of the same path hash identically.
pub fn unique_name(path: &Path, project_root: &Path) -> String {
    let key = relative_key(path, project_root);
    let digest = blake3::hash(key.as_bytes()).to_hex();
    let stem = path
        .file_stem()
        .map(|s| sanitize(&s.to_string_lossy()))
        .unwrap_or_default();
    format!("{}-{}", &digest[..PATH_HASH_LEN], stem)
}

/// The normalized project-relative key hashed by [`unique_name`].
fn relative_key(path: &Path, project_root: &Path) -> String {
    let root = normalize_path(project_root);
    let absolute = if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&root.join(path))
    };
    let relative = absolute.strip_prefix(&root).unwrap_or(&absolute);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lowercase a file stem and collapse every run of characters outside
/// `[a-z0-9]` into a single `-`.
pub fn sanitize(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push_str("image");
    }
    out
}

/// File stem shared by every generated artifact of one image version.
pub fn artifact_stem(image_hash: &str, unique_name: &str) -> String {
    format!("{image_hash}{unique_name}")
}

/// Normalize an extension into the image type stored in the cache.
pub fn normalize_type(extension: &str) -> String {
    let lower = extension.to_ascii_lowercase();
    if lower == "jpg" {
        "jpeg".to_string()
    } else {
        lower
    }
}
