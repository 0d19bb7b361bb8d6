//! Metadata provider backed by the external `exiftool` program.

use super::{MetadataProvider, MetadataRecord};
use crate::error::MetadataError;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const TOOL_NAME: &str = "exiftool";

/// Runs `exiftool -json <file>` for every lookup
#[derive(Debug, Clone)]
pub struct ExifToolProvider {
    program: PathBuf,
}

impl ExifToolProvider {
    /// Use `exiftool` from `PATH`
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(TOOL_NAME),
        }
    }

    /// Use a specific exiftool binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 {
            return self.program.is_file().then(|| self.program.clone());
        }

        let search_path = env::var_os("PATH")?;
        env::split_paths(&search_path).find_map(|dir| {
            let candidate = dir.join(&self.program);
            if candidate.is_file() {
                return Some(candidate);
            }
            let with_exe = candidate.with_extension(env::consts::EXE_EXTENSION);
            (!env::consts::EXE_EXTENSION.is_empty() && with_exe.is_file()).then_some(with_exe)
        })
    }
}

impl Default for ExifToolProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for ExifToolProvider {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn is_available(&self) -> bool {
        self.locate().is_some()
    }

    fn resolve_metadata(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        let output = Command::new(&self.program)
            .arg("-json")
            .arg(path)
            .output()
            .map_err(|e| MetadataError::ToolFailed {
                tool: TOOL_NAME.to_string(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetadataError::ToolFailed {
                tool: TOOL_NAME.to_string(),
                path: path.to_path_buf(),
                reason: stderr.trim().to_string(),
            });
        }

        parse_output(path, &output.stdout)
    }
}

/// exiftool prints a JSON array with one object per input file
fn parse_output(path: &Path, stdout: &[u8]) -> Result<MetadataRecord, MetadataError> {
    let records: Vec<MetadataRecord> =
        serde_json::from_slice(stdout).map_err(|e| MetadataError::InvalidOutput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    records.into_iter().next().ok_or_else(|| MetadataError::NoRecord {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_takes_first_record() {
        let stdout = br#"[{
            "SourceFile": "/photos/a.jpg",
            "MIMEType": "image/jpeg",
            "FileTypeExtension": "jpg",
            "CreateDate": "2021:05:03 10:00:00"
        }]"#;

        let record = parse_output(Path::new("/photos/a.jpg"), stdout).unwrap();
        assert_eq!(record.mime_type, "image/jpeg");
        assert_eq!(record.file_type_extension, "jpg");
        assert!(record.created_at().is_some());
    }

    #[test]
    fn parse_empty_array_has_no_record() {
        let result = parse_output(Path::new("/x"), b"[]");
        assert!(matches!(result, Err(MetadataError::NoRecord { .. })));
    }

    #[test]
    fn parse_garbage_is_invalid_output() {
        let result = parse_output(Path::new("/x"), b"Error: file not found");
        assert!(matches!(result, Err(MetadataError::InvalidOutput { .. })));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let provider = ExifToolProvider::with_program("definitely-not-a-real-tool-4821");
        assert!(!provider.is_available());
    }

    #[test]
    fn missing_program_fails_lookup() {
        let provider = ExifToolProvider::with_program("/nonexistent/bin/exiftool");
        let result = provider.resolve_metadata(Path::new("/photos/a.jpg"));
        assert!(matches!(result, Err(MetadataError::ToolFailed { .. })));
    }
}
