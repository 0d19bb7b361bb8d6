//! In-process metadata provider using kamadak-exif.
//!
//! MIME type and extension come from the file name; the creation date
//! comes from EXIF when the container has any. Audio tags are never
//! available, so audio files only sort by date (which EXIF rarely has).

use super::{MetadataProvider, MetadataRecord};
use crate::error::MetadataError;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extension -> (MIME type, canonical extension)
const KNOWN_TYPES: &[(&str, &str, &str)] = &[
    ("jpg", "image/jpeg", "jpg"),
    ("jpeg", "image/jpeg", "jpg"),
    ("png", "image/png", "png"),
    ("gif", "image/gif", "gif"),
    ("webp", "image/webp", "webp"),
    ("heic", "image/heic", "heic"),
    ("heif", "image/heif", "heif"),
    ("tif", "image/tiff", "tif"),
    ("tiff", "image/tiff", "tif"),
    ("bmp", "image/bmp", "bmp"),
    ("dng", "image/x-adobe-dng", "dng"),
    ("mp4", "video/mp4", "mp4"),
    ("m4v", "video/x-m4v", "m4v"),
    ("mov", "video/quicktime", "mov"),
    ("avi", "video/x-msvideo", "avi"),
    ("mkv", "video/x-matroska", "mkv"),
    ("webm", "video/webm", "webm"),
    ("mp3", "audio/mpeg", "mp3"),
    ("m4a", "audio/mp4", "m4a"),
    ("flac", "audio/flac", "flac"),
    ("ogg", "audio/ogg", "ogg"),
    ("wav", "audio/x-wav", "wav"),
];

/// Reads EXIF directly; needs no external tool
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifProvider;

impl ExifProvider {
    pub fn new() -> Self {
        Self
    }

    fn read_create_date(path: &Path) -> Option<String> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut reader).ok()?;

        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .find_map(|tag| exif.get_field(tag, In::PRIMARY))
            .and_then(|field| ascii_value(&field.value))
    }
}

impl MetadataProvider for ExifProvider {
    fn name(&self) -> &str {
        "exif"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn resolve_metadata(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        // Surface unreadable files the same way exiftool would.
        File::open(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let (mime_type, file_type_extension) = KNOWN_TYPES
            .iter()
            .find(|(ext, _, _)| *ext == extension)
            .map(|(_, mime, canonical)| (mime.to_string(), canonical.to_string()))
            .unwrap_or_else(|| ("application/octet-stream".to_string(), extension.clone()));

        let create_date = if mime_type.starts_with("image/") {
            Self::read_create_date(path).unwrap_or_default()
        } else {
            String::new()
        };

        Ok(MetadataRecord {
            mime_type,
            create_date,
            file_type_extension,
            ..Default::default()
        })
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        let bytes = vec.first()?;
        let text = std::str::from_utf8(bytes).ok()?;
        let trimmed = text.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap().write_all(content).unwrap();
        path
    }

    #[test]
    fn guesses_mime_from_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "clip.MOV", b"not really a movie");

        let record = ExifProvider::new().resolve_metadata(&path).unwrap();
        assert_eq!(record.mime_type, "video/quicktime");
        assert_eq!(record.file_type_extension, "mov");
        assert!(record.create_date.is_empty());
    }

    #[test]
    fn jpeg_without_exif_has_no_date() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "photo.jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]);

        let record = ExifProvider::new().resolve_metadata(&path).unwrap();
        assert_eq!(record.primary_type(), "image");
        assert_eq!(record.file_type_extension, "jpg");
        assert!(record.created_at().is_none());
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "notes.xyz", b"plain");

        let record = ExifProvider::new().resolve_metadata(&path).unwrap();
        assert_eq!(record.primary_type(), "application");
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ExifProvider::new().resolve_metadata(Path::new("/nonexistent/a.jpg"));
        assert!(matches!(result, Err(MetadataError::Io { .. })));
    }

    #[test]
    fn ascii_value_trims_nul_padding() {
        let value = Value::Ascii(vec![b"2021:05:03 10:00:00\0".to_vec()]);
        assert_eq!(ascii_value(&value), Some("2021:05:03 10:00:00".to_string()));
    }
}
