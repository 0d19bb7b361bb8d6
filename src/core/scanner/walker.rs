//! Directory walking implementation using walkdir.

use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Scanner implementation using the walkdir crate.
///
/// Symlinks are never followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirScanner;

impl WalkDirScanner {
    pub fn new() -> Self {
        Self
    }

    /// Start a lazy walk over `root`.
    ///
    /// The root is canonicalized first so every yielded path is absolute.
    pub fn walk(&self, root: &Path) -> Result<FileWalk, ScanError> {
        let root = fs::canonicalize(root).map_err(|e| classify_io(root, e))?;

        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root });
        }

        let inner = WalkDir::new(&root).follow_links(false).into_iter();
        Ok(FileWalk { root, inner })
    }
}

/// Lazy iterator over the regular files of a tree
pub struct FileWalk {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl FileWalk {
    /// The canonical root this walk started from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Iterator for FileWalk {
    type Item = Result<PathBuf, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        return Some(Ok(entry.into_path()));
                    }
                    if !file_type.is_dir() {
                        debug!(path = %entry.path().display(), "skipping non-regular file");
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = match e.into_io_error() {
                        Some(io) => classify_io(&path, io),
                        None => ScanError::Walk {
                            path: path.clone(),
                            source: std::io::Error::other("filesystem loop detected"),
                        },
                    };
                    return Some(Err(error));
                }
            }
        }
    }
}

fn classify_io(path: &Path, error: std::io::Error) -> ScanError {
    match error.kind() {
        std::io::ErrorKind::NotFound => ScanError::DirectoryNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ScanError::Walk {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
