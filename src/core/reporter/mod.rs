//! # Reporter Module
//!
//! Writes the end-of-run reports into `<destination>/Errors/`:
//!
//! - `sort-it_duplicates.html`: every canonical file linked to its duplicates
//! - `sort-it_duplicates.json`: the same groups as JSON
//! - `sort-it_errors.json`: every per-file error with its message

mod export;

pub use export::{
    write_duplicates_json, write_errors_json, DuplicatesPage, GroupEntry, LinkEntry,
};

use crate::core::organize::Layout;
use crate::core::pipeline::RunReport;
use crate::error::ReportError;
use askama::Template;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DUPLICATES_HTML: &str = "sort-it_duplicates.html";
pub const DUPLICATES_JSON: &str = "sort-it_duplicates.json";
pub const ERRORS_JSON: &str = "sort-it_errors.json";

/// Paths of the written report files
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub duplicates_html: PathBuf,
    pub duplicates_json: PathBuf,
    pub errors_json: PathBuf,
}

/// Writes all report files for a run
#[derive(Debug, Clone)]
pub struct ReportWriter {
    layout: Layout,
}

impl ReportWriter {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn write_all(&self, report: &RunReport) -> Result<ReportFiles, ReportError> {
        let dir = self.layout.reports_dir();
        fs::create_dir_all(&dir).map_err(|source| ReportError::Io {
            path: dir.clone(),
            source,
        })?;

        let groups = report.duplicate_groups();
        let files = ReportFiles {
            duplicates_html: dir.join(DUPLICATES_HTML),
            duplicates_json: dir.join(DUPLICATES_JSON),
            errors_json: dir.join(ERRORS_JSON),
        };

        write_file(&files.duplicates_html, |w| {
            let html = DuplicatesPage::new(report, &groups).render()?;
            w.write_all(html.as_bytes()).map_err(|source| ReportError::Io {
                path: files.duplicates_html.clone(),
                source,
            })
        })?;
        write_file(&files.duplicates_json, |w| Ok(write_duplicates_json(&groups, w)?))?;
        write_file(&files.errors_json, |w| Ok(write_errors_json(&report.errors, w)?))?;

        info!(
            dir = %dir.display(),
            groups = groups.len(),
            errors = report.errors.len(),
            "reports written"
        );
        Ok(files)
    }
}

fn write_file<F>(path: &Path, body: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ReportError>,
{
    let io_error = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    body(&mut writer)?;
    writer.flush().map_err(io_error)
}
