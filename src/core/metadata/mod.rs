//! # Metadata Module
//!
//! Fetches the handful of metadata fields the destination resolver needs.
//!
//! The pipeline only sees the [`MetadataProvider`] trait, so where metadata
//! comes from is a deployment choice:
//! - [`ExifToolProvider`] shells out to `exiftool -json` (images, video, audio tags)
//! - [`ExifProvider`] reads EXIF in-process (images only, no external tool)
//!
//! Records are fetched once per unique file and never cached.

mod exif_reader;
mod exiftool;

pub use exif_reader::ExifProvider;
pub use exiftool::ExifToolProvider;

use crate::error::MetadataError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Local civil time, e.g. `2021:05:03 10:00:00`
const CREATE_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
/// Offset-qualified variant, e.g. `2021:05:03 10:00:00+02:00`
const CREATE_DATE_OFFSET_FORMAT: &str = "%Y:%m:%d %H:%M:%S%:z";

/// Metadata for a single file, keyed the way exiftool names its fields.
///
/// Missing fields deserialize to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    #[serde(rename = "MIMEType", deserialize_with = "lenient_string")]
    pub mime_type: String,
    #[serde(rename = "CreateDate", deserialize_with = "lenient_string")]
    pub create_date: String,
    #[serde(rename = "FileTypeExtension", deserialize_with = "lenient_string")]
    pub file_type_extension: String,
    #[serde(rename = "Artist", deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(rename = "Album", deserialize_with = "lenient_string")]
    pub album: String,
    #[serde(rename = "Title", deserialize_with = "lenient_string")]
    pub title: String,
}

impl MetadataRecord {
    /// First component of the MIME type (`image` for `image/jpeg`)
    pub fn primary_type(&self) -> &str {
        self.mime_type.split('/').next().unwrap_or_default()
    }

    /// Creation time, if `create_date` is in one of the accepted formats.
    ///
    /// Offset-qualified values keep their wall-clock time; the offset is
    /// dropped rather than converted.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        let raw = self.create_date.trim();

        NaiveDateTime::parse_from_str(raw, CREATE_DATE_FORMAT)
            .ok()
            .or_else(|| {
                DateTime::parse_from_str(raw, CREATE_DATE_OFFSET_FORMAT)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    /// Artist, album and title are all present
    pub fn has_audio_tags(&self) -> bool {
        !self.artist.trim().is_empty()
            && !self.album.trim().is_empty()
            && !self.title.trim().is_empty()
    }
}

/// Source of per-file metadata.
///
/// Implementations must be callable from many worker threads at once.
pub trait MetadataProvider: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Whether the provider can work in this environment at all.
    ///
    /// Checked once before scanning; an unavailable provider aborts the run
    /// when the sort mode needs metadata.
    fn is_available(&self) -> bool;

    /// Fetch the metadata record for one file
    fn resolve_metadata(&self, path: &Path) -> Result<MetadataRecord, MetadataError>;
}

/// exiftool prints numeric-looking tags (a title of `1999`) as JSON numbers
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
