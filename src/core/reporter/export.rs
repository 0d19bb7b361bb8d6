//! Report serialisation.
//!
//! The HTML report links every canonical file to its duplicates with
//! `file://` links so they can be compared side by side in a browser.

use crate::core::pipeline::{DuplicateGroup, ErrorRecord, RunReport};
use askama::Template;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The duplicate report page. Names are escaped by the template.
#[derive(Template)]
#[template(path = "duplicates.html")]
pub struct DuplicatesPage {
    pub run_id: String,
    pub duplicate_count: usize,
    pub groups: Vec<GroupEntry>,
}

/// One canonical file and its duplicates
pub struct GroupEntry {
    pub hash: String,
    pub canonical: LinkEntry,
    pub duplicates: Vec<LinkEntry>,
}

/// A file name and the `file://` URL it links to
pub struct LinkEntry {
    pub name: String,
    pub url: String,
}

impl DuplicatesPage {
    /// Link every canonical file to where it was placed, or to its source
    /// when it was not. Duplicates link to their copy when there is one.
    pub fn new(report: &RunReport, groups: &[DuplicateGroup]) -> Self {
        let copies: HashMap<&str, &str> = report
            .duplicates
            .iter()
            .filter_map(|d| d.copied_to.as_deref().map(|to| (d.relative_path.as_str(), to)))
            .collect();

        let groups = groups
            .iter()
            .map(|group| {
                let canonical = match &group.canonical_destination {
                    Some(destination) => join_relative(&report.destination, destination),
                    None => join_relative(&report.source, &group.canonical_path),
                };

                let duplicates = group
                    .duplicate_paths
                    .iter()
                    .map(|duplicate| {
                        let target = match copies.get(duplicate.as_str()) {
                            Some(copied_to) => join_relative(&report.destination, copied_to),
                            None => join_relative(&report.source, duplicate),
                        };
                        LinkEntry {
                            name: duplicate.clone(),
                            url: file_url(&target),
                        }
                    })
                    .collect();

                GroupEntry {
                    hash: group.hash.clone(),
                    canonical: LinkEntry {
                        name: group.canonical_path.clone(),
                        url: file_url(&canonical),
                    },
                    duplicates,
                }
            })
            .collect();

        Self {
            run_id: report.id.to_string(),
            duplicate_count: report.duplicates.len(),
            groups,
        }
    }
}

/// Write the duplicate groups as pretty JSON
pub fn write_duplicates_json<W: Write>(
    groups: &[DuplicateGroup],
    writer: W,
) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, groups)
}

/// Write the per-file errors as pretty JSON
pub fn write_errors_json<W: Write>(errors: &[ErrorRecord], writer: W) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(writer, errors)
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|c| !c.is_empty())
        .fold(root.to_path_buf(), |path, component| path.join(component))
}

/// `file://` URL for an absolute path, percent-encoding anything unsafe
fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !raw.starts_with('/') {
        url.push('/');
    }

    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{:02X}", byte)),
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{DuplicateFile, SortedFile};
    use uuid::Uuid;

    fn test_report(copied: bool) -> RunReport {
        RunReport {
            id: Uuid::nil(),
            source: PathBuf::from("/src"),
            destination: PathBuf::from("/dest"),
            total_files: 2,
            sorted: vec![SortedFile {
                path: PathBuf::from("/src/a <1>.txt"),
                relative_path: "a <1>.txt".to_string(),
                hash: "h1".to_string(),
                destination: "Data/a <1>.txt".to_string(),
            }],
            duplicates: vec![DuplicateFile {
                path: PathBuf::from("/src/sub/b.txt"),
                relative_path: "sub/b.txt".to_string(),
                hash: "h1".to_string(),
                canonical_path: "a <1>.txt".to_string(),
                copied_to: copied.then(|| "Errors/Duplicates/sub/b.txt".to_string()),
            }],
            errors: vec![ErrorRecord {
                path: PathBuf::from("/src/c.txt"),
                message: "Destination file already exists (/dest/Data/c.txt)".to_string(),
            }],
            excluded: Vec::new(),
            duration_ms: 5,
        }
    }

    fn html(report: &RunReport) -> String {
        DuplicatesPage::new(report, &report.duplicate_groups())
            .render()
            .unwrap()
    }

    #[test]
    fn html_links_canonical_destination_and_escapes_names() {
        let html = html(&test_report(false));

        assert!(html.contains("file:///dest/Data/a%20%3C1%3E.txt"));
        assert!(html.contains("a &lt;1&gt;.txt"));
        assert!(!html.contains("a <1>.txt"));
    }

    #[test]
    fn html_links_duplicates_in_source_unless_copied() {
        assert!(html(&test_report(false)).contains("file:///src/sub/b.txt"));
        assert!(html(&test_report(true)).contains("file:///dest/Errors/Duplicates/sub/b.txt"));
    }

    #[test]
    fn duplicates_json_lists_groups() {
        let report = test_report(false);
        let mut output = Vec::new();
        write_duplicates_json(&report.duplicate_groups(), &mut output).unwrap();

        let parsed: Vec<DuplicateGroup> = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].duplicate_paths, vec!["sub/b.txt"]);
    }

    #[test]
    fn errors_json_keeps_path_and_message() {
        let report = test_report(false);
        let mut output = Vec::new();
        write_errors_json(&report.errors, &mut output).unwrap();

        let parsed: Vec<ErrorRecord> = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed, report.errors);
    }

    #[test]
    fn file_url_handles_drive_letters() {
        assert_eq!(file_url(Path::new("C:\\photos\\a.jpg")), "file:///C:/photos/a.jpg");
    }
}
