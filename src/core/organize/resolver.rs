//! Destination resolution for unique files.

use super::types::{Layout, Resolution, SortMode, MULTIMEDIA_DIR};
use crate::core::metadata::{MetadataProvider, MetadataRecord};
use crate::core::scanner::ScannedFile;
use crate::error::MetadataError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Computes where a unique file belongs
pub struct DestinationResolver<'a> {
    mode: SortMode,
    metadata: &'a dyn MetadataProvider,
}

impl<'a> DestinationResolver<'a> {
    pub fn new(mode: SortMode, metadata: &'a dyn MetadataProvider) -> Self {
        Self { mode, metadata }
    }

    /// Resolve the destination of `file`.
    ///
    /// A failed metadata lookup is only an error in multimedia-only mode;
    /// otherwise the file falls back to `Data/<relative path>`.
    pub fn resolve(&self, file: &ScannedFile) -> Result<Resolution, MetadataError> {
        let default = Layout::data_path(&file.relative);

        if !self.mode.needs_metadata() {
            return Ok(Resolution::Place(default));
        }

        let record = match self.metadata.resolve_metadata(&file.path) {
            Ok(record) => record,
            Err(e) if self.mode == SortMode::MultimediaOnly => return Err(e),
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "no metadata, using default destination");
                return Ok(Resolution::Place(default));
            }
        };

        Ok(resolve_with_record(self.mode, &record, &file.relative))
    }
}

/// Pure part of resolution: same inputs, same destination.
pub fn resolve_with_record(mode: SortMode, record: &MetadataRecord, relative: &Path) -> Resolution {
    match multimedia_path(record, relative) {
        Some(path) => Resolution::Place(PathBuf::from(path)),
        None if mode == SortMode::MultimediaOnly => Resolution::Excluded,
        None => Resolution::Place(Layout::data_path(relative)),
    }
}

/// Multimedia destination, or `None` when the file does not classify
pub fn multimedia_path(record: &MetadataRecord, relative: &Path) -> Option<String> {
    let date = record.created_at();
    let ext = extension(record, relative);

    match (record.primary_type(), date) {
        ("image", Some(date)) => Some(dated_path("Pictures", "IMG", date, &ext)),
        ("video", Some(date)) => Some(dated_path("Videos", "VID", date, &ext)),
        ("audio", _) if record.has_audio_tags() => Some(format!(
            "{}/Audio/Music/{}/{}/{}",
            MULTIMEDIA_DIR,
            path_component(&record.artist),
            path_component(&record.album),
            with_extension(path_component(&record.title), &ext),
        )),
        ("audio", Some(date)) => Some(dated_path("Audio/Sounds", "AUD", date, &ext)),
        _ => None,
    }
}

/// `Multimedia/<kind>/<YYYY>/<MM Month>/<PREFIX>_<YYYYMMDD_HHMMSS>.<ext>`
fn dated_path(kind: &str, prefix: &str, date: NaiveDateTime, ext: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        MULTIMEDIA_DIR,
        kind,
        date.format("%Y"),
        date.format("%m %B"),
        with_extension(format!("{}_{}", prefix, date.format("%Y%m%d_%H%M%S")), ext),
    )
}

/// Extension from the metadata, falling back to the source file name
fn extension(record: &MetadataRecord, relative: &Path) -> String {
    let from_record = record.file_type_extension.trim();
    if !from_record.is_empty() {
        return path_component(from_record).to_lowercase();
    }

    relative
        .extension()
        .map(|ext| path_component(&ext.to_string_lossy()).to_lowercase())
        .unwrap_or_default()
}

fn with_extension(name: String, ext: &str) -> String {
    if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    }
}

/// Make a tag value safe to use as exactly one path component
fn path_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
