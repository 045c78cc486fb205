//! Lumen Core - incremental image asset pipeline.
//!
//! Lumen scans a project for source images and writes web-ready
//! derivatives: resized variants, an optional public copy of the original,
//! and a tiny WebP placeholder. A two-tier cache (modification time in front
//! of content hashes) keeps repeat runs close to free, and a configuration
//! fingerprint forces a clean rebuild whenever settings change.
//!
//! # Architecture
//!
//! ```text
//! Scan → Config gate → Cache validate → Process (decode, original, thumbnail, variants)
//!      → Reap stale entries → Flush caches
//! ```
//!
//! The [`hydrate`] module consumes the persisted cache independently to
//! rewrite image references inside document trees.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, NoProgress, Pipeline};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> lumen_core::Result<()> {
//!     let root = std::env::current_dir()?;
//!     let config = Config::load(&root, None)?;
//!     let paths = config.resolve(&root);
//!
//!     let report = Pipeline::new(&config, &paths).run(&NoProgress).await?;
//!     println!("{} processed, {} cached", report.processed, report.total_images_cached);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod hydrate;
pub mod pipeline;
pub mod types;

pub use cache::CacheStore;
pub use config::{Config, ResolvedPaths};
pub use error::{
    CacheError, ConfigError, HydrateError, LumenError, PipelineError, PipelineResult, Result,
};
pub use hydrate::{HydrateReport, Hydrator, Node};
pub use pipeline::reaper::clear_all;
pub use pipeline::Pipeline;
pub use types::{BatchReport, ImageFileRecord, NoProgress, ProgressReporter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
