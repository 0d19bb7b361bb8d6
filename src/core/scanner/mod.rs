//! # Scanner Module
//!
//! Discovers every regular file under a source folder.
//!
//! Symlinks and special files (sockets, fifos, devices) are skipped; they
//! never reach the hasher. Any traversal error is fatal for the run, since
//! the discovered total drives progress and termination downstream.
//!
//! ## Example
//! ```rust,ignore
//! use sort_it::core::scanner::WalkDirScanner;
//!
//! let scanner = WalkDirScanner::new();
//! for path in scanner.walk("/data/unsorted".as_ref())? {
//!     println!("{}", path?.display());
//! }
//! ```

mod walker;

pub use walker::{FileWalk, WalkDirScanner};

use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// A discovered file on its way through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Absolute path to the file
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    /// Path relative to the source root, byte for byte.
    /// Destinations are built from this one.
    #[serde(skip)]
    pub relative: PathBuf,
    /// `relative` as `/`-separated text, for reports and display
    pub relative_path: String,
    /// Hex content hash, once hashed
    pub hash: Option<String>,
    /// Why the file could not be hashed
    pub error: Option<String>,
}

impl ScannedFile {
    /// Create a record for `path` discovered under `root`
    pub fn new(path: PathBuf, root: &Path) -> Self {
        let relative = relative_path(root, &path);
        Self {
            relative_path: display_relative(&relative),
            path,
            relative,
            hash: None,
            error: None,
        }
    }

    pub fn with_hash(mut self, hash: String) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Strip the components `path` shares with `root`.
///
/// The comparison is per component, so `/a/b` is not a prefix of `/a/bc/d`.
/// Names are kept as they are on disk, even when they are not valid UTF-8.
pub fn relative_path(root: &Path, path: &Path) -> PathBuf {
    let mut remaining = path.components().peekable();

    for base in root.components() {
        if remaining.peek() == Some(&base) {
            remaining.next();
        } else {
            break;
        }
    }

    remaining.collect()
}

/// Join the components of a relative path with `/`.
///
/// Bytes that are not valid UTF-8 are replaced, so the result is for
/// reports and display only, never for building a path again.
pub fn display_relative(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Serialize a path as text, replacing bytes that are not valid UTF-8
pub fn serialize_lossy<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_strips_root_components() {
        let rel = relative_path(
            Path::new("/data/unsorted"),
            Path::new("/data/unsorted/2019/trip/a.jpg"),
        );
        assert_eq!(rel, PathBuf::from("2019/trip/a.jpg"));
    }

    #[test]
    fn relative_path_ignores_trailing_separator() {
        let rel = relative_path(Path::new("/data/unsorted/"), Path::new("/data/unsorted/a.txt"));
        assert_eq!(rel, PathBuf::from("a.txt"));
    }

    #[test]
    fn relative_path_matches_whole_components_only() {
        let rel = relative_path(Path::new("/data/un"), Path::new("/data/unsorted/a.txt"));
        assert_eq!(rel, PathBuf::from("unsorted/a.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_path_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/src");
        let first = root.join(OsStr::from_bytes(b"caf\xE9.txt"));
        let second = root.join(OsStr::from_bytes(b"caf\xE8.txt"));

        let first_rel = relative_path(root, &first);
        let second_rel = relative_path(root, &second);

        assert_eq!(first_rel.as_os_str().as_bytes(), b"caf\xE9.txt");
        assert_ne!(first_rel, second_rel);
        // Only the display form is lossy.
        assert_eq!(display_relative(&first_rel), display_relative(&second_rel));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_serializes_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from("/src").join(OsStr::from_bytes(b"caf\xE9.txt"));
        let file = ScannedFile::new(path, Path::new("/src"));

        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("caf\u{FFFD}.txt"));
    }

    #[test]
    fn scanned_file_starts_unhashed() {
        let file = ScannedFile::new(PathBuf::from("/src/x/y.bin"), Path::new("/src"));
        assert_eq!(file.relative, PathBuf::from("x/y.bin"));
        assert_eq!(file.relative_path, "x/y.bin");
        assert!(file.hash.is_none());
        assert!(file.error.is_none());
    }
}
