//! Image processing pipeline components.
//!
//! - **discovery**: find source images and name them (**naming**)
//! - **hash**: content hashes for change detection and file names
//! - **decode**: the codec boundary (decode, resize, encode)
//! - **thumbnail**: WebP placeholder data URLs
//! - **processor**: per-file orchestration
//! - **reaper**: removal of stale rows and artifacts
//! - **runner**: one full incremental batch

pub mod decode;
pub mod discovery;
pub mod hash;
pub mod naming;
pub mod processor;
pub mod reaper;
pub mod runner;
pub mod thumbnail;

pub use decode::{DecodedImage, EncodeFormat, EncodeOptions, ImageCodec, RasterCodec};
pub use discovery::FileDiscovery;
pub use hash::Hasher;
pub use processor::{FileOutcome, ImageProcessor};
pub use reaper::Reaper;
pub use runner::Pipeline;
pub use thumbnail::{Placeholder, ThumbnailGenerator};
