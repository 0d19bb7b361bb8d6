//! # Error Module
//!
//! Error types for the sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, tool names, what went wrong
//! - **Per-file errors are data** - only scan failures, missing tooling and
//!   broken pipeline invariants abort a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SortError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Report generation error: {0}")]
    Report(#[from] ReportError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("{tool} not available. Install it or pick another metadata source.")]
    ToolUnavailable { tool: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while walking the source tree.
///
/// Any of these aborts the run: the discovered total would be wrong.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while hashing file content
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by a metadata provider
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{tool} failed for {path}: {reason}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Unreadable metadata output for {path}: {reason}")]
    InvalidOutput { path: PathBuf, reason: String },

    #[error("Cannot get metadata for {path}")]
    NoRecord { path: PathBuf },

    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while copying a file into the destination
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("{path} is not a regular file")]
    NotRegularFile { path: PathBuf },

    #[error("Destination file already exists ({path})")]
    AlreadyExists { path: PathBuf },

    #[error("Failed to copy {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while writing the report files
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to render report: {0}")]
    Template(#[from] askama::Error),
}

/// Broken pipeline invariants
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Expected {expected} results but observed {observed}")]
    OutcomeMismatch { expected: usize, observed: usize },

    #[error("A {stage} worker panicked")]
    WorkerPanicked { stage: &'static str },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SortError>;
