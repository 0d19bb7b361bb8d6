//! Copy execution into the destination layout.

use super::types::Layout;
use crate::error::CopyError;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Copy the bytes of `source` to a new file at `destination`.
///
/// The source must be a regular file and the destination must not exist;
/// an existing destination is never overwritten. Missing parent folders are
/// created. Returns the number of bytes copied.
pub fn copy_file(source: &Path, destination: &Path) -> Result<u64, CopyError> {
    let io_error = |source_error: io::Error| CopyError::Io {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: source_error,
    };

    let metadata = fs::symlink_metadata(source).map_err(io_error)?;
    if !metadata.file_type().is_file() {
        return Err(CopyError::NotRegularFile {
            path: source.to_path_buf(),
        });
    }

    if fs::symlink_metadata(destination).is_ok() {
        return Err(CopyError::AlreadyExists {
            path: destination.to_path_buf(),
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut reader = File::open(source).map_err(io_error)?;

    // create_new closes the race with another worker placing the same path.
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => CopyError::AlreadyExists {
                path: destination.to_path_buf(),
            },
            _ => io_error(e),
        })?;

    match io::copy(&mut reader, &mut writer) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(destination);
            Err(io_error(e))
        }
    }
}

/// A failed copy, plus the outcome of the quarantine attempt if one was made
#[derive(Debug)]
pub struct CopyFailure {
    pub error: CopyError,
    pub quarantine: Option<Result<PathBuf, CopyError>>,
}

impl fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        match &self.quarantine {
            Some(Ok(path)) => write!(f, " (quarantined at {})", path.display()),
            Some(Err(e)) => write!(f, " (quarantine failed: {})", e),
            None => Ok(()),
        }
    }
}

/// Copies files into a [`Layout`]
#[derive(Debug, Clone)]
pub struct CopyExecutor {
    layout: Layout,
    quarantine_failures: bool,
}

impl CopyExecutor {
    pub fn new(layout: Layout, quarantine_failures: bool) -> Self {
        Self {
            layout,
            quarantine_failures,
        }
    }

    /// Copy `source` to the destination-relative path `relative_destination`.
    ///
    /// On an I/O failure, and only if quarantining is enabled, a second
    /// best-effort copy goes to `Errors/Failed/<relative>`, where `relative`
    /// is the source-relative path.
    pub fn place(
        &self,
        source: &Path,
        relative: &Path,
        relative_destination: &Path,
    ) -> Result<PathBuf, CopyFailure> {
        let destination = self.layout.resolve(relative_destination);

        match copy_file(source, &destination) {
            Ok(_) => Ok(destination),
            Err(error) => {
                let quarantine = match error {
                    CopyError::Io { .. } if self.quarantine_failures => {
                        Some(self.quarantine(source, relative))
                    }
                    _ => None,
                };
                Err(CopyFailure { error, quarantine })
            }
        }
    }

    fn quarantine(&self, source: &Path, relative: &Path) -> Result<PathBuf, CopyError> {
        let target = self.layout.resolve(&Layout::failed_path(relative));
        copy_file(source, &target)
            .map(|_| target)
            .inspect_err(|e| warn!(path = %source.display(), error = %e, "quarantine copy failed"))
    }
}
