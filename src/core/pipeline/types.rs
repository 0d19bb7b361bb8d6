//! Records produced by a run.

use crate::core::scanner::{serialize_lossy, ScannedFile};
use crate::events::PipelineSummary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use uuid::Uuid;

/// A unique file that was copied into the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedFile {
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    pub relative_path: String,
    pub hash: String,
    /// Destination-relative path the file was copied to
    pub destination: String,
}

/// A file whose content was already seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFile {
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    pub relative_path: String,
    pub hash: String,
    /// Source-relative path of the canonical file for this hash
    pub canonical_path: String,
    /// Destination-relative path of the copy, when duplicates are copied
    pub copied_to: Option<String>,
}

/// A file that failed somewhere in the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    pub message: String,
}

/// All duplicates of one hash, next to their canonical file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub hash: String,
    /// Source-relative path of the canonical file
    pub canonical_path: String,
    /// Destination-relative path of the canonical file, if it was placed
    pub canonical_destination: Option<String>,
    /// Source-relative paths of every duplicate, sorted
    pub duplicate_paths: Vec<String>,
}

/// Terminal state of one discovered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sorted(SortedFile),
    Duplicate(DuplicateFile),
    Error(ErrorRecord),
    /// Unique but not multimedia, in multimedia-only mode
    Excluded(ScannedFile),
}

/// Everything a run produced, with every list sorted by path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,
    #[serde(serialize_with = "serialize_lossy")]
    pub source: PathBuf,
    #[serde(serialize_with = "serialize_lossy")]
    pub destination: PathBuf,
    pub total_files: usize,
    pub sorted: Vec<SortedFile>,
    pub duplicates: Vec<DuplicateFile>,
    pub errors: Vec<ErrorRecord>,
    pub excluded: Vec<ScannedFile>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Group duplicates by hash, ordered by canonical path
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let destinations: HashMap<&str, &str> = self
            .sorted
            .iter()
            .map(|f| (f.hash.as_str(), f.destination.as_str()))
            .collect();

        let mut groups: BTreeMap<&str, DuplicateGroup> = BTreeMap::new();
        for duplicate in &self.duplicates {
            groups
                .entry(duplicate.hash.as_str())
                .or_insert_with(|| DuplicateGroup {
                    hash: duplicate.hash.clone(),
                    canonical_path: duplicate.canonical_path.clone(),
                    canonical_destination: destinations
                        .get(duplicate.hash.as_str())
                        .map(|d| d.to_string()),
                    duplicate_paths: Vec::new(),
                })
                .duplicate_paths
                .push(duplicate.relative_path.clone());
        }

        let mut groups: Vec<DuplicateGroup> = groups.into_values().collect();
        for group in &mut groups {
            group.duplicate_paths.sort();
        }
        groups.sort_by(|a, b| a.canonical_path.cmp(&b.canonical_path));
        groups
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_files: self.total_files,
            sorted_count: self.sorted.len(),
            duplicate_count: self.duplicates.len(),
            duplicate_groups: self.duplicate_groups().len(),
            error_count: self.errors.len(),
            excluded_count: self.excluded.len(),
            duration_ms: self.duration_ms,
        }
    }
}
