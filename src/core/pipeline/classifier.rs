//! Duplicate classification.
//!
//! The classifier owns the hash-seen index. It is driven from exactly one
//! loop, so the index needs no lock: ownership is the synchronisation.

use super::types::ErrorRecord;
use crate::core::scanner::ScannedFile;
use std::collections::HashMap;

/// What to do with one hashed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// First occurrence of its hash; needs a destination
    Unique { file: ScannedFile, hash: String },
    /// Content already seen
    Duplicate {
        file: ScannedFile,
        hash: String,
        /// Source-relative path of the canonical file
        canonical_path: String,
    },
    /// Hashing failed upstream
    Failed(ErrorRecord),
}

/// First-seen-wins duplicate classifier.
///
/// "First" means first to arrive here. Hashing runs concurrently, so which
/// of several identical files becomes canonical can differ between runs.
/// Any of them is an equally valid canonical copy.
#[derive(Debug, Default)]
pub struct DuplicateClassifier {
    seen: HashMap<String, String>,
}

impl DuplicateClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one file. Each hash enters the index exactly once.
    pub fn classify(&mut self, file: ScannedFile) -> Decision {
        if let Some(message) = &file.error {
            return Decision::Failed(ErrorRecord {
                path: file.path.clone(),
                message: message.clone(),
            });
        }

        let Some(hash) = file.hash.clone() else {
            return Decision::Failed(ErrorRecord {
                path: file.path,
                message: "file was never hashed".to_string(),
            });
        };

        match self.seen.get(&hash) {
            Some(canonical) => Decision::Duplicate {
                canonical_path: canonical.clone(),
                file,
                hash,
            },
            None => {
                self.seen.insert(hash.clone(), file.relative_path.clone());
                Decision::Unique { file, hash }
            }
        }
    }

    /// Number of distinct hashes seen so far
    pub fn distinct_hashes(&self) -> usize {
        self.seen.len()
    }
}
