//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the sort pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Per-file sorting events (hash, classify, copy)
    Sort(SortEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A file was discovered; the count only ever grows
    Progress(ScanProgress),
    /// Scanning completed
    Completed { total_files: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of files discovered so far
    pub files_found: usize,
    /// File that was just discovered
    pub current_path: PathBuf,
}

/// Events emitted once per file as it reaches a terminal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SortEvent {
    /// A unique file was copied to its destination
    Placed { path: PathBuf, destination: PathBuf },
    /// A file was recognised as a duplicate
    Duplicate { path: PathBuf, hash: String },
    /// A unique file was skipped (multimedia-only mode)
    Excluded { path: PathBuf },
    /// The file failed somewhere along the way; the run continues
    Error { path: PathBuf, message: String },
    /// Overall progress after each terminal outcome
    Progress(SortProgress),
}

/// Progress information while sorting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortProgress {
    /// Files that reached a terminal state
    pub processed: usize,
    /// Files discovered by the scanner so far
    pub total_discovered: usize,
}

impl SortProgress {
    /// Percentage done, as far as the scanner has seen
    pub fn percent(&self) -> f64 {
        if self.total_discovered == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total_discovered as f64 * 100.0
    }
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Sorting,
    Reporting,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total files discovered
    pub total_files: usize,
    /// Files copied into the destination
    pub sorted_count: usize,
    /// Files recognised as duplicates
    pub duplicate_count: usize,
    /// Distinct hashes with at least one duplicate
    pub duplicate_groups: usize,
    /// Files that failed
    pub error_count: usize,
    /// Files skipped in multimedia-only mode
    pub excluded_count: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Sorting => write!(f, "Sorting"),
            PipelinePhase::Reporting => write!(f, "Reporting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Scan(ScanEvent::Progress(ScanProgress {
            files_found: 50,
            current_path: PathBuf::from("/unsorted/a.jpg"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.files_found, 50);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn progress_percent_handles_empty_scan() {
        let progress = SortProgress {
            processed: 0,
            total_discovered: 0,
        };
        assert_eq!(progress.percent(), 0.0);
    }

    #[test]
    fn progress_percent_is_relative_to_discovered() {
        let progress = SortProgress {
            processed: 1,
            total_discovered: 4,
        };
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);
    }
}
