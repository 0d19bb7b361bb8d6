//! Types for the organize module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unclassified unique files, mirroring the source tree
pub const DATA_DIR: &str = "Data";
/// Classified pictures, videos and audio
pub const MULTIMEDIA_DIR: &str = "Multimedia";
/// Reports and everything that did not sort cleanly
pub const ERRORS_DIR: &str = "Errors";
/// Copies of duplicates, under [`ERRORS_DIR`]
pub const DUPLICATES_DIR: &str = "Duplicates";
/// Quarantined copies of files whose copy failed, under [`ERRORS_DIR`]
pub const FAILED_DIR: &str = "Failed";

/// What a run sorts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Sort everything; multimedia by metadata, the rest into `Data/`
    #[default]
    Full,
    /// Only deduplicate; every unique file goes to `Data/`, no metadata lookups
    DuplicatesOnly,
    /// Only sort multimedia; other unique files are skipped
    MultimediaOnly,
}

impl SortMode {
    /// Whether unique files need a metadata lookup
    pub fn needs_metadata(&self) -> bool {
        !matches!(self, SortMode::DuplicatesOnly)
    }
}

/// Where a unique file should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Copy to this destination-relative path
    Place(PathBuf),
    /// Skip without copying and without an error
    Excluded,
}

/// The destination folder and its reserved subtrees
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path for a destination-relative path
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Folder the report files are written to
    pub fn reports_dir(&self) -> PathBuf {
        self.root.join(ERRORS_DIR)
    }

    /// Relative destination of a duplicate copy
    pub fn duplicate_path(relative: &Path) -> PathBuf {
        Path::new(ERRORS_DIR).join(DUPLICATES_DIR).join(relative)
    }

    /// Relative destination of a quarantined file
    pub fn failed_path(relative: &Path) -> PathBuf {
        Path::new(ERRORS_DIR).join(FAILED_DIR).join(relative)
    }

    /// Relative default destination of a unique file
    pub fn data_path(relative: &Path) -> PathBuf {
        Path::new(DATA_DIR).join(relative)
    }
}
