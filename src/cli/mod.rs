//! # CLI Module
//!
//! Command-line interface for sort-it.
//!
//! ## Usage
//! ```bash
//! # Sort everything, multimedia by metadata
//! sort-it ~/Unsorted ~/Sorted
//!
//! # Only deduplicate, keeping duplicates aside for review
//! sort-it ~/Unsorted ~/Sorted --duplicates-only --copy-duplicates
//!
//! # Only pictures, videos and audio, without exiftool
//! sort-it ~/Unsorted ~/Sorted --multimedia-only --metadata exif
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use sort_it::core::metadata::{ExifProvider, ExifToolProvider, MetadataProvider};
use sort_it::core::organize::{Layout, SortMode};
use sort_it::core::pipeline::{default_workers, Pipeline, RunReport};
use sort_it::core::reporter::{DUPLICATES_HTML, ERRORS_JSON};
use sort_it::error::{Result, SortError};
use sort_it::events::{Event, EventChannel, PipelineEvent, ScanEvent, SortEvent};
use std::path::{Path, PathBuf};
use std::thread;

/// sort-it - Sort an unorganized folder and find every duplicate on the way
#[derive(Parser, Debug)]
#[command(name = "sort-it")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder to sort (never modified)
    source: PathBuf,

    /// Folder to sort into
    destination: PathBuf,

    /// Copy duplicates into Errors/Duplicates/ instead of only reporting them
    #[arg(long)]
    copy_duplicates: bool,

    /// Only deduplicate: every unique file goes to Data/
    #[arg(long, conflicts_with = "multimedia_only")]
    duplicates_only: bool,

    /// Only sort pictures, videos and audio; skip everything else
    #[arg(long)]
    multimedia_only: bool,

    /// Where file metadata comes from
    #[arg(long, default_value = "exiftool")]
    metadata: MetadataSource,

    /// Threads per worker pool (defaults to the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Copy files that fail to copy into Errors/Failed/ instead
    #[arg(long)]
    quarantine_failures: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetadataSource {
    /// The exiftool program (must be on PATH)
    Exiftool,
    /// Built-in EXIF reader; dates for pictures only
    Exif,
}

impl MetadataSource {
    fn provider(self) -> Box<dyn MetadataProvider> {
        match self {
            MetadataSource::Exiftool => Box::new(ExifToolProvider::new()),
            MetadataSource::Exif => Box::new(ExifProvider::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON summary for scripting
    Json,
}

impl Cli {
    fn mode(&self) -> SortMode {
        if self.duplicates_only {
            SortMode::DuplicatesOnly
        } else if self.multimedia_only {
            SortMode::MultimediaOnly
        } else {
            SortMode::Full
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    sort_it::init_tracing(if cli.verbose {
        "sort_it=debug"
    } else {
        "sort_it=warn"
    });

    validate_folder("source", &cli.source)?;
    validate_folder("destination", &cli.destination)?;

    let term = Term::stderr();
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("sort-it").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let pipeline = Pipeline::builder()
        .source(&cli.source)
        .destination(&cli.destination)
        .mode(cli.mode())
        .copy_duplicates(cli.copy_duplicates)
        .workers(cli.workers.unwrap_or_else(default_workers))
        .quarantine_failures(cli.quarantine_failures)
        .metadata(cli.metadata.provider())
        .build();

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            receiver.iter().for_each(drop);
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_length(p.files_found as u64);
                }
                Event::Sort(SortEvent::Progress(p)) => {
                    pb.set_length(p.total_discovered as u64);
                    pb.set_position(p.processed as u64);
                }
                Event::Sort(SortEvent::Error { path, message }) if verbose => {
                    pb.println(format!(
                        "{} {}: {}",
                        style("✗").red(),
                        path.display(),
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Error { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let report = result?;

    match cli.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, verbose),
        OutputFormat::Json => print_json_results(&report)?,
    }

    Ok(())
}

fn validate_folder(role: &str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SortError::Config(format!(
            "{} folder does not exist: {}",
            role,
            path.display()
        )))
    }
}

fn print_pretty_results(term: &Term, report: &RunReport, verbose: bool) {
    let summary = report.summary();
    let reports_dir = Layout::new(&report.destination).reports_dir();

    term.write_line(&format!("{} Sort Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files processed in {:.1}s",
        style(summary.total_files).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} files sorted", style(summary.sorted_count).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} duplicates in {} groups",
        style(summary.duplicate_count).cyan(),
        summary.duplicate_groups
    ))
    .ok();
    if summary.excluded_count > 0 {
        term.write_line(&format!(
            "  {} files skipped (not multimedia)",
            style(summary.excluded_count).dim()
        ))
        .ok();
    }

    if summary.error_count > 0 {
        term.write_line(&format!(
            "  {} errors, see {}",
            style(summary.error_count).red().bold(),
            reports_dir.join(ERRORS_JSON).display()
        ))
        .ok();
    }

    if verbose && !report.errors.is_empty() {
        term.write_line("").ok();
        for record in &report.errors {
            term.write_line(&format!(
                "    {} {}: {}",
                style("✗").red(),
                record.path.display(),
                style(&record.message).dim()
            ))
            .ok();
        }
    }

    term.write_line("").ok();
    if summary.duplicate_count > 0 {
        term.write_line(&format!(
            "  Duplicates report: {}",
            style(reports_dir.join(DUPLICATES_HTML).display()).underlined()
        ))
        .ok();
    }
    term.write_line(&format!(
        "{}",
        style("The source folder was not modified.").dim()
    ))
    .ok();
}

fn print_json_results(report: &RunReport) -> Result<()> {
    let summary = report.summary();
    let output = serde_json::json!({
        "run_id": report.id.to_string(),
        "total_files": summary.total_files,
        "sorted_count": summary.sorted_count,
        "duplicate_count": summary.duplicate_count,
        "duplicate_groups": summary.duplicate_groups,
        "error_count": summary.error_count,
        "excluded_count": summary.excluded_count,
        "duration_ms": summary.duration_ms,
        "errors": report.errors,
    });

    let text = serde_json::to_string_pretty(&output).map_err(sort_it::error::ReportError::from)?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "sort-it",
            "in",
            "out",
            "--duplicates-only",
            "--multimedia-only",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_map_to_sort_mode() {
        let cli = Cli::try_parse_from(["sort-it", "in", "out"]).unwrap();
        assert_eq!(cli.mode(), SortMode::Full);

        let cli = Cli::try_parse_from(["sort-it", "in", "out", "--multimedia-only"]).unwrap();
        assert_eq!(cli.mode(), SortMode::MultimediaOnly);

        let cli = Cli::try_parse_from(["sort-it", "in", "out", "--duplicates-only"]).unwrap();
        assert_eq!(cli.mode(), SortMode::DuplicatesOnly);
    }

    #[test]
    fn missing_folder_fails_validation() {
        let result = validate_folder("source", Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(SortError::Config(_))));
    }
}
