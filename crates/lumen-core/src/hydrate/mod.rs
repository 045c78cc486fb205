//! Rewriting document image references into responsive `img` elements.
//!
//! The hydrator reads the persisted content-hash cache and turns each local
//! image reference of a document tree into an MDX `img` element carrying
//! `src`, `srcSet`, `width`, `height` and `blurDataURL`. It never touches the
//! image pipeline; an image that was not processed yet is left as-is.

pub mod node;

use std::path::{Path, PathBuf};

use crate::cache::{CacheStore, ContentCache, ContentCacheEntry};
use crate::config::{Config, ResolvedPaths, ORIGINAL_DIR};
use crate::error::HydrateError;
use crate::pipeline::decode::EncodeFormat;
use crate::pipeline::naming::{artifact_stem, normalize_type, unique_name};
use crate::pipeline::processor::variant_sizes;
use crate::pipeline::thumbnail::load_placeholder;

pub use node::Node;
use node::{expression_attribute, merge_attributes, string_attribute, IMAGE, JSX_TEXT};

/// Counts of what one hydration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrateReport {
    /// References rewritten
    pub hydrated: usize,
    /// Remote or data references left alone
    pub remote: usize,
    /// Local references left alone (not cached, or no derivative)
    pub unresolved: usize,
}

/// Resolved image attributes for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttributes {
    pub src: String,
    pub src_set: Vec<(String, u32)>,
    pub width: u32,
    pub height: u32,
    pub blur_data_url: Option<String>,
}

impl ImageAttributes {
    fn into_jsx(self) -> Vec<serde_json::Value> {
        let mut attrs = vec![string_attribute("src", &self.src)];
        if !self.src_set.is_empty() {
            let src_set = self
                .src_set
                .iter()
                .map(|(url, size)| format!("{url} {size}w"))
                .collect::<Vec<_>>()
                .join(", ");
            attrs.push(string_attribute("srcSet", &src_set));
        }
        attrs.push(expression_attribute("width", self.width));
        attrs.push(expression_attribute("height", self.height));
        if let Some(blur) = &self.blur_data_url {
            attrs.push(string_attribute("blurDataURL", blur));
        }
        attrs
    }
}

/// Pure tree transform backed by a snapshot of the content-hash cache.
pub struct Hydrator {
    content: ContentCache,
    project_root: PathBuf,
    thumbnail_dir: PathBuf,
    url_prefix: String,
    sizes: Vec<u32>,
    move_original: bool,
    compress_original: bool,
}

impl Hydrator {
    pub fn new(content: ContentCache, config: &Config, paths: &ResolvedPaths) -> Self {
        Self {
            content,
            project_root: paths.project_root.clone(),
            thumbnail_dir: paths.thumbnail_dir.clone(),
            url_prefix: paths.public_url_prefix.clone(),
            sizes: config.optimised_image_sizes.clone(),
            move_original: config.move_original_image_to_public,
            compress_original: config.compress_original_image,
        }
    }

    /// Build a hydrator over the persisted content-hash cache.
    pub fn from_disk(config: &Config, paths: &ResolvedPaths) -> Self {
        Self::new(CacheStore::load_content(&paths.cache_dir), config, paths)
    }

    /// Hydrate a tree whose relative references are relative to `doc_dir`.
    ///
    /// Existing `img` elements are hydrated first, then plain image nodes are
    /// converted. Nodes produced by either pass are not visited again.
    pub fn hydrate(&self, tree: &Node, doc_dir: &Path) -> (Node, HydrateReport) {
        let mut report = HydrateReport::default();
        let tree = rebuild(tree, &mut |node: &Node| {
            node.is_jsx_img()
                .then(|| self.hydrate_jsx(node, doc_dir, &mut report))
                .flatten()
        });
        let tree = rebuild(&tree, &mut |node: &Node| {
            (node.kind == IMAGE)
                .then(|| self.convert_image(node, doc_dir, &mut report))
                .flatten()
        });
        (tree, report)
    }

    fn hydrate_jsx(&self, node: &Node, doc_dir: &Path, report: &mut HydrateReport) -> Option<Node> {
        let reference = node.attribute_str("src")?;
        let attrs = self.lookup(reference, doc_dir, report)?;

        let mut hydrated = node.clone();
        let merged = merge_attributes(node.attributes(), attrs.into_jsx());
        hydrated
            .fields
            .insert("attributes".to_string(), serde_json::Value::Array(merged));
        Some(hydrated)
    }

    fn convert_image(&self, node: &Node, doc_dir: &Path, report: &mut HydrateReport) -> Option<Node> {
        let reference = node.str_field("url")?;
        let attrs = self.lookup(reference, doc_dir, report)?;

        let mut existing = Vec::new();
        for key in ["alt", "title"] {
            if let Some(value) = node.str_field(key) {
                existing.push(string_attribute(key, value));
            }
        }

        let mut img = Node::new(JSX_TEXT);
        img.fields.insert("name".to_string(), "img".into());
        img.fields.insert(
            "attributes".to_string(),
            serde_json::Value::Array(merge_attributes(&existing, attrs.into_jsx())),
        );
        if let Some(position) = node.fields.get("position") {
            img.fields.insert("position".to_string(), position.clone());
        }
        Some(img)
    }

    /// Resolve with logging; `None` leaves the node unmodified.
    fn lookup(
        &self,
        reference: &str,
        doc_dir: &Path,
        report: &mut HydrateReport,
    ) -> Option<ImageAttributes> {
        if is_remote(reference) {
            report.remote += 1;
            return None;
        }
        match self.resolve(reference, doc_dir) {
            Ok(attrs) => {
                report.hydrated += 1;
                Some(attrs)
            }
            Err(e) => {
                tracing::warn!("{e}");
                report.unresolved += 1;
                None
            }
        }
    }

    /// Resolve one local reference to its generated attributes.
    pub fn resolve(&self, reference: &str, doc_dir: &Path) -> Result<ImageAttributes, HydrateError> {
        let path = self.reference_path(reference, doc_dir);
        let name = unique_name(&path, &self.project_root);
        let entry = self
            .content
            .get(&name)
            .ok_or_else(|| HydrateError::Unresolved {
                reference: reference.to_string(),
                unique_name: name.clone(),
            })?;

        let image_type = entry
            .original_file_type
            .clone()
            .or_else(|| {
                path.extension()
                    .map(|ext| normalize_type(&ext.to_string_lossy()))
            })
            .unwrap_or_default();
        let format = EncodeFormat::for_source(&image_type);
        let stem = artifact_stem(&entry.image_hash, &name);

        let widths: Vec<u32> = match entry.width {
            Some(width) => variant_sizes(&self.sizes, width).collect(),
            None => Vec::new(),
        };
        let src_set: Vec<(String, u32)> = widths
            .iter()
            .map(|&size| {
                let url = format!("{}/{size}/{stem}.{}", self.url_prefix, format.extension());
                (url, size)
            })
            .collect();

        let src = if self.move_original {
            let ext = if self.compress_original {
                format.extension()
            } else {
                image_type.as_str()
            };
            format!("{}/{ORIGINAL_DIR}/{stem}.{ext}", self.url_prefix)
        } else {
            src_set
                .iter()
                .max_by_key(|(_, size)| *size)
                .map(|(url, _)| url.clone())
                .ok_or_else(|| HydrateError::NoDerivative {
                    reference: reference.to_string(),
                })?
        };

        let (width, height) = dimensions(entry);
        Ok(ImageAttributes {
            src,
            src_set,
            width,
            height,
            blur_data_url: load_placeholder(&self.thumbnail_dir, &name).map(|p| p.placeholder),
        })
    }

    /// Root-relative references (`/img/a.png`) are anchored at the project
    /// root, everything else at the document directory.
    fn reference_path(&self, reference: &str, doc_dir: &Path) -> PathBuf {
        let reference = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference);
        match reference.strip_prefix('/') {
            Some(rooted) => self.project_root.join(rooted),
            None => doc_dir.join(reference),
        }
    }
}

/// Rebuild `node`, replacing whatever `replace` returns a node for.
/// Replacements are not descended into.
fn rebuild(node: &Node, replace: &mut dyn FnMut(&Node) -> Option<Node>) -> Node {
    if let Some(replaced) = replace(node) {
        return replaced;
    }
    Node {
        kind: node.kind.clone(),
        children: node
            .children
            .iter()
            .map(|child| rebuild(child, replace))
            .collect(),
        fields: node.fields.clone(),
    }
}

fn dimensions(entry: &ContentCacheEntry) -> (u32, u32) {
    (entry.width.unwrap_or(0), entry.height.unwrap_or(0))
}

/// Remote, protocol-relative and inline references are never hydrated.
pub fn is_remote(reference: &str) -> bool {
    ["http:", "https:", "//", "data:"]
        .iter()
        .any(|prefix| reference.starts_with(prefix))
}
