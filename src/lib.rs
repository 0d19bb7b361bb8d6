//! # sort-it
//!
//! Sorts an unorganized folder into a clean destination layout and reports
//! every byte-identical duplicate it finds on the way.
//!
//! ## Core Philosophy
//! - **Never touch the source** - files are copied, never moved or deleted
//! - **Never overwrite** - an existing destination file is an error, not a target
//! - **Report everything** - duplicates and per-file errors end up in reports
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - The scan, hash, classify and copy pipeline
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SortError};

/// Initialize tracing for the library
///
/// `default_directive` is used when `RUST_LOG` is not set.
/// This should be called by the application entry point.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
