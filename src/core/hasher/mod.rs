//! # Hasher Module
//!
//! Computes content hashes used as the identity of a file.
//!
//! Two files are duplicates exactly when their MD5 digests over the full
//! byte content match. Nothing else (name, size, timestamps) is considered.
//!
//! ## Example
//! ```rust,ignore
//! use sort_it::core::hasher::ContentHasher;
//!
//! let hash = ContentHasher::new().hash_file(&path)?;
//! assert_eq!(hash.len(), 32);
//! ```

use crate::error::HashError;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read buffer size for streaming file content
const BUFFER_SIZE: usize = 64 * 1024;

/// Streams file content through MD5.
///
/// Stateless, so a single instance can be shared by every hashing worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash the full content of the file at `path`
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let file = File::open(path).map_err(|source| HashError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.hash_reader(file).map_err(|source| HashError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Hash everything `reader` yields, as 32 lowercase hex characters
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<String> {
        let mut context = md5::Context::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            context.consume(&buffer[..read]);
        }

        Ok(format!("{:x}", context.compute()))
    }
}
