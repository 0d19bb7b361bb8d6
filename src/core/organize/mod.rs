//! Destination layout, resolution and copying.
//!
//! Unique files go to `Data/<relative path>` or, when their metadata
//! classifies them, to a date- or tag-based folder under `Multimedia/`.
//! Duplicates, quarantined files and reports live under `Errors/`.

mod copier;
mod resolver;
mod types;

pub use copier::{copy_file, CopyExecutor, CopyFailure};
pub use resolver::{multimedia_path, resolve_with_record, DestinationResolver};
pub use types::*;
