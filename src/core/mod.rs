//! # Core Module
//!
//! The UI-agnostic sort engine.
//!
//! ## Modules
//! - `scanner` - Discovers every regular file under the source folder
//! - `hasher` - Computes MD5 content hashes
//! - `metadata` - Looks up MIME type, dates and audio tags
//! - `organize` - Destination layout, resolution and copying
//! - `pipeline` - Runs the stages concurrently and aggregates outcomes
//! - `reporter` - Writes the duplicate and error reports

pub mod hasher;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod reporter;
pub mod scanner;

// Re-export commonly used types
pub use organize::SortMode;
pub use pipeline::{Pipeline, RunReport};
pub use scanner::ScannedFile;
