//! Pipeline execution implementation.
//!
//! Stages run on scoped threads joined by bounded queues:
//!
//! ```text
//! scanner -> work -> hash pool -> intake -> classifier -> placement -> copy pool
//!                                              |                          |
//!                                              +--------> tally <---------+
//!                                                           |
//!                                                       aggregator
//! ```
//!
//! The graph has no cycles, so a full queue can only ever wait on a stage
//! further downstream, and the aggregator never waits on anyone.

use super::aggregator::{Aggregator, Tally};
use super::classifier::{Decision, DuplicateClassifier};
use super::types::{DuplicateFile, ErrorRecord, Outcome, RunReport, SortedFile};
use crate::core::hasher::ContentHasher;
use crate::core::metadata::{ExifToolProvider, MetadataProvider};
use crate::core::organize::{CopyExecutor, DestinationResolver, Layout, Resolution, SortMode};
use crate::core::reporter::ReportWriter;
use crate::core::scanner::{display_relative, ScannedFile, WalkDirScanner};
use crate::error::{HashError, PipelineError, ScanError, SortError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, ScanEvent, ScanProgress,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Capacity of every inter-stage queue
pub const QUEUE_CAPACITY: usize = 100;

/// Default pool size: one worker per available core
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Folder to sort
    pub source: PathBuf,
    /// Folder to sort into
    pub destination: PathBuf,
    pub mode: SortMode,
    /// Copy duplicates into `Errors/Duplicates/` instead of only listing them
    pub copy_duplicates: bool,
    /// Threads in each of the hash and copy pools
    pub workers: usize,
    /// Retry failed copies into `Errors/Failed/`
    pub quarantine_failures: bool,
    /// Write the report files at the end of the run
    pub write_reports: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            mode: SortMode::default(),
            copy_duplicates: false,
            workers: default_workers(),
            quarantine_failures: false,
            write_reports: true,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    metadata: Option<Box<dyn MetadataProvider>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            metadata: None,
        }
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    pub fn mode(mut self, mode: SortMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn copy_duplicates(mut self, copy: bool) -> Self {
        self.config.copy_duplicates = copy;
        self
    }

    /// Set the size of each worker pool (at least 1)
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    pub fn quarantine_failures(mut self, quarantine: bool) -> Self {
        self.config.quarantine_failures = quarantine;
        self
    }

    pub fn write_reports(mut self, write: bool) -> Self {
        self.config.write_reports = write;
        self
    }

    /// Set the metadata provider (defaults to exiftool)
    pub fn metadata(mut self, provider: Box<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            metadata: self
                .metadata
                .unwrap_or_else(|| Box::new(ExifToolProvider::new())),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The sort pipeline
pub struct Pipeline {
    config: PipelineConfig,
    metadata: Box<dyn MetadataProvider>,
}

/// Input of the classifier loop
enum Intake {
    File(ScannedFile),
    ScanFinished(usize),
    ScanFailed(ScanError),
}

/// Work for the copy pool
enum Placement {
    Unique {
        file: ScannedFile,
        hash: String,
    },
    Duplicate {
        relative: PathBuf,
        duplicate: DuplicateFile,
    },
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<RunReport, SortError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport, SortError> {
        let result = self.execute(events);
        if let Err(e) = &result {
            error!(error = %e, "run aborted");
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: e.to_string(),
            }));
        }
        result
    }

    fn execute(&self, events: &EventSender) -> Result<RunReport, SortError> {
        let config = &self.config;

        if config.mode.needs_metadata() && !self.metadata.is_available() {
            return Err(SortError::ToolUnavailable {
                tool: self.metadata.name().to_string(),
            });
        }

        let walk = WalkDirScanner::new().walk(&config.source)?;
        let root = walk.root().to_path_buf();

        if let Ok(destination) = fs::canonicalize(&config.destination) {
            if destination.starts_with(&root) {
                return Err(SortError::Config(format!(
                    "destination {} is inside source {}",
                    destination.display(),
                    root.display()
                )));
            }
        }

        let hasher = ContentHasher::new();
        self.sort(root, walk, &|path: &Path| hasher.hash_file(path), events)
    }

    /// Run every stage over the files `walk` yields under `root`
    fn sort<W, H>(
        &self,
        root: PathBuf,
        walk: W,
        hash: &H,
        events: &EventSender,
    ) -> Result<RunReport, SortError>
    where
        W: Iterator<Item = Result<PathBuf, ScanError>> + Send,
        H: Fn(&Path) -> Result<String, HashError> + Sync,
    {
        let start_time = Instant::now();
        let id = Uuid::new_v4();
        let config = &self.config;

        let workers = config.workers.max(1);
        info!(
            run_id = %id,
            source = %root.display(),
            destination = %config.destination.display(),
            mode = ?config.mode,
            workers,
            "starting run"
        );

        events.send(Event::Pipeline(PipelineEvent::Started));
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Sorting,
        }));
        events.send(Event::Scan(ScanEvent::Started { root: root.clone() }));

        let layout = Layout::new(&config.destination);
        let resolver = DestinationResolver::new(config.mode, self.metadata.as_ref());
        let copier = CopyExecutor::new(layout.clone(), config.quarantine_failures);
        let discovered = AtomicUsize::new(0);

        let (work_tx, work_rx) = bounded::<ScannedFile>(QUEUE_CAPACITY);
        let (intake_tx, intake_rx) = bounded::<Intake>(QUEUE_CAPACITY);
        let (placement_tx, placement_rx) = bounded::<Placement>(QUEUE_CAPACITY);
        let (tally_tx, tally_rx) = bounded::<Tally>(QUEUE_CAPACITY);

        let aggregator = thread::scope(|scope| -> Result<Aggregator, SortError> {
            let discovered = &discovered;
            let resolver = &resolver;
            let copier = &copier;
            let mut handles = Vec::with_capacity(2 * workers + 1);

            {
                let intake_tx = intake_tx.clone();
                let root = root.as_path();
                handles.push((
                    "scanner",
                    scope.spawn(move || {
                        scan_stage(root, walk, work_tx, intake_tx, discovered, events)
                    }),
                ));
            }

            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let intake_tx = intake_tx.clone();
                handles.push((
                    "hash",
                    scope.spawn(move || hash_stage(hash, work_rx, intake_tx)),
                ));
            }
            drop(work_rx);
            drop(intake_tx);

            for _ in 0..workers {
                let placement_rx = placement_rx.clone();
                let tally_tx = tally_tx.clone();
                handles.push((
                    "copy",
                    scope.spawn(move || place_stage(resolver, copier, placement_rx, tally_tx)),
                ));
            }
            drop(placement_rx);

            let collector = scope
                .spawn(move || Aggregator::new().collect(&tally_rx, events, discovered));

            let classified =
                classify_stage(intake_rx, placement_tx, tally_tx, config.copy_duplicates, discovered);

            let collected = collector.join();
            for (stage, handle) in handles {
                if handle.join().is_err() {
                    return Err(PipelineError::WorkerPanicked { stage }.into());
                }
            }
            let collected =
                collected.map_err(|_| PipelineError::WorkerPanicked { stage: "aggregator" })?;

            // A scan failure explains any shortfall the aggregator saw.
            classified?;
            Ok(collected?)
        })?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let report = aggregator.finish(id, root, config.destination.clone(), duration_ms);

        if config.write_reports {
            events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Reporting,
            }));
            ReportWriter::new(layout).write_all(&report)?;
        }

        let summary = report.summary();
        info!(
            run_id = %id,
            total = summary.total_files,
            sorted = summary.sorted_count,
            duplicates = summary.duplicate_count,
            errors = summary.error_count,
            excluded = summary.excluded_count,
            duration_ms,
            "run finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));

        Ok(report)
    }
}

/// Walk the source tree, feeding the hash pool.
///
/// Announces the total (or the failure) to the classifier when done.
fn scan_stage<W>(
    root: &Path,
    walk: W,
    work: Sender<ScannedFile>,
    intake: Sender<Intake>,
    discovered: &AtomicUsize,
    events: &EventSender,
) where
    W: Iterator<Item = Result<PathBuf, ScanError>>,
{
    let mut total = 0;

    for entry in walk {
        match entry {
            Ok(path) => {
                total += 1;
                discovered.fetch_add(1, Ordering::SeqCst);
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    files_found: total,
                    current_path: path.clone(),
                })));
                if work.send(ScannedFile::new(path, root)).is_err() {
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "scan failed");
                let _ = intake.send(Intake::ScanFailed(e));
                return;
            }
        }
    }

    drop(work);
    info!(total, "scan finished");
    events.send(Event::Scan(ScanEvent::Completed { total_files: total }));
    let _ = intake.send(Intake::ScanFinished(total));
}

fn hash_stage<H>(hash: &H, work: Receiver<ScannedFile>, intake: Sender<Intake>)
where
    H: Fn(&Path) -> Result<String, HashError>,
{
    for file in work.iter() {
        let file = match hash(&file.path) {
            Ok(digest) => file.with_hash(digest),
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "hash failed");
                file.with_error(e.to_string())
            }
        };
        if intake.send(Intake::File(file)).is_err() {
            break;
        }
    }
}

/// The single classification loop.
///
/// Runs until it has classified as many files as the scanner discovered.
/// Returns early, with `Ok`, if a downstream stage has gone away; that stage
/// reports its own error.
fn classify_stage(
    intake: Receiver<Intake>,
    placements: Sender<Placement>,
    tally: Sender<Tally>,
    copy_duplicates: bool,
    discovered: &AtomicUsize,
) -> Result<(), SortError> {
    let mut classifier = DuplicateClassifier::new();
    let mut expected = None;
    let mut processed = 0usize;

    while expected != Some(processed) {
        let Ok(message) = intake.recv() else {
            return Err(PipelineError::OutcomeMismatch {
                expected: expected.unwrap_or_else(|| discovered.load(Ordering::SeqCst)),
                observed: processed,
            }
            .into());
        };

        let delivered = match message {
            Intake::ScanFinished(total) => {
                expected = Some(total);
                tally.send(Tally::Expect(total)).is_ok()
            }
            Intake::ScanFailed(e) => return Err(e.into()),
            Intake::File(file) => {
                processed += 1;
                match classifier.classify(file) {
                    Decision::Unique { file, hash } => {
                        placements.send(Placement::Unique { file, hash }).is_ok()
                    }
                    Decision::Duplicate {
                        file,
                        hash,
                        canonical_path,
                    } => {
                        let duplicate = DuplicateFile {
                            path: file.path,
                            relative_path: file.relative_path,
                            hash,
                            canonical_path,
                            copied_to: None,
                        };
                        if copy_duplicates {
                            let relative = file.relative;
                            placements
                                .send(Placement::Duplicate { relative, duplicate })
                                .is_ok()
                        } else {
                            tally.send(Tally::Outcome(Outcome::Duplicate(duplicate))).is_ok()
                        }
                    }
                    Decision::Failed(record) => {
                        tally.send(Tally::Outcome(Outcome::Error(record))).is_ok()
                    }
                }
            }
        };

        if !delivered {
            return Ok(());
        }
    }

    debug!(
        processed,
        distinct = classifier.distinct_hashes(),
        "classification finished"
    );
    Ok(())
}

fn place_stage(
    resolver: &DestinationResolver<'_>,
    copier: &CopyExecutor,
    placements: Receiver<Placement>,
    tally: Sender<Tally>,
) {
    for placement in placements.iter() {
        let outcome = match placement {
            Placement::Unique { file, hash } => place_unique(resolver, copier, file, hash),
            Placement::Duplicate {
                relative,
                duplicate,
            } => place_duplicate(copier, &relative, duplicate),
        };
        if tally.send(Tally::Outcome(outcome)).is_err() {
            break;
        }
    }
}

fn place_unique(
    resolver: &DestinationResolver<'_>,
    copier: &CopyExecutor,
    file: ScannedFile,
    hash: String,
) -> Outcome {
    let destination = match resolver.resolve(&file) {
        Ok(Resolution::Place(destination)) => destination,
        Ok(Resolution::Excluded) => return Outcome::Excluded(file),
        Err(e) => {
            return Outcome::Error(ErrorRecord {
                path: file.path,
                message: e.to_string(),
            })
        }
    };

    match copier.place(&file.path, &file.relative, &destination) {
        Ok(_) => Outcome::Sorted(SortedFile {
            path: file.path,
            relative_path: file.relative_path,
            hash,
            destination: display_relative(&destination),
        }),
        Err(failure) => Outcome::Error(ErrorRecord {
            path: file.path,
            message: failure.to_string(),
        }),
    }
}

fn place_duplicate(
    copier: &CopyExecutor,
    relative: &Path,
    mut duplicate: DuplicateFile,
) -> Outcome {
    let target = Layout::duplicate_path(relative);

    match copier.place(&duplicate.path, relative, &target) {
        Ok(_) => {
            duplicate.copied_to = Some(display_relative(&target));
            Outcome::Duplicate(duplicate)
        }
        Err(failure) => Outcome::Error(ErrorRecord {
            path: duplicate.path,
            message: failure.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetadataRecord;
    use crate::error::MetadataError;
    use crate::events::{EventChannel, SortEvent};
    use std::path::Path;
    use tempfile::TempDir;

    struct Unavailable;

    impl MetadataProvider for Unavailable {
        fn name(&self) -> &str {
            "missing-tool"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn resolve_metadata(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
            Err(MetadataError::NoRecord {
                path: path.to_path_buf(),
            })
        }
    }

    fn write(dir: &Path, relative: &str, content: &[u8]) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn dirs() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        let destination = temp.path().join("destination");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&destination).unwrap();
        (temp, source, destination)
    }

    fn duplicates_only(source: &Path, destination: &Path) -> PipelineBuilder {
        Pipeline::builder()
            .source(source)
            .destination(destination)
            .mode(SortMode::DuplicatesOnly)
            .write_reports(false)
            .workers(3)
    }

    #[test]
    fn pipeline_builder_creates_pipeline() {
        let pipeline = Pipeline::builder()
            .source("/in")
            .destination("/out")
            .copy_duplicates(true)
            .workers(0)
            .build();

        assert_eq!(pipeline.config().workers, 1);
        assert!(pipeline.config().copy_duplicates);
        assert_eq!(pipeline.config().mode, SortMode::Full);
    }

    #[test]
    fn empty_source_completes() {
        let (_temp, source, destination) = dirs();

        let report = duplicates_only(&source, &destination).build().run().unwrap();

        assert_eq!(report.total_files, 0);
        assert!(report.sorted.is_empty());
    }

    #[test]
    fn every_file_reaches_exactly_one_outcome() {
        let (_temp, source, destination) = dirs();
        for i in 0..250 {
            write(&source, &format!("d{}/f{}.bin", i % 7, i), format!("{}", i % 40).as_bytes());
        }

        let report = duplicates_only(&source, &destination).build().run().unwrap();

        assert_eq!(report.total_files, 250);
        assert_eq!(report.sorted.len(), 40);
        assert_eq!(report.duplicates.len(), 210);
        assert_eq!(report.duplicate_groups().len(), 40);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn single_worker_pool_does_not_deadlock() {
        let (_temp, source, destination) = dirs();
        for i in 0..(QUEUE_CAPACITY * 3) {
            write(&source, &format!("f{}.txt", i), b"same");
        }

        let report = duplicates_only(&source, &destination)
            .workers(1)
            .copy_duplicates(true)
            .build()
            .run()
            .unwrap();

        assert_eq!(report.sorted.len(), 1);
        assert_eq!(report.duplicates.len(), QUEUE_CAPACITY * 3 - 1);
        assert!(report.duplicates.iter().all(|d| d.copied_to.is_some()));
    }

    #[test]
    fn unavailable_tool_aborts_before_scanning() {
        let (_temp, source, destination) = dirs();
        write(&source, "a.txt", b"a");

        let result = Pipeline::builder()
            .source(&source)
            .destination(&destination)
            .metadata(Box::new(Unavailable))
            .build()
            .run();

        assert!(matches!(result, Err(SortError::ToolUnavailable { .. })));
        assert!(!destination.join("Data").exists());
    }

    #[test]
    fn unavailable_tool_is_fine_in_duplicates_only() {
        let (_temp, source, destination) = dirs();
        write(&source, "a.txt", b"a");

        let report = duplicates_only(&source, &destination)
            .metadata(Box::new(Unavailable))
            .build()
            .run()
            .unwrap();

        assert_eq!(report.sorted.len(), 1);
    }

    #[test]
    fn missing_source_is_a_scan_error() {
        let (temp, _source, destination) = dirs();

        let result = duplicates_only(&temp.path().join("nope"), &destination)
            .build()
            .run();

        assert!(matches!(result, Err(SortError::Scan(_))));
    }

    #[test]
    fn hash_failure_is_recorded_and_the_run_continues() {
        let (_temp, source, destination) = dirs();
        for i in 0..20 {
            write(&source, &format!("f{}.txt", i), format!("{}", i % 5).as_bytes());
        }
        write(&source, "broken.txt", b"unreadable");
        let hasher = ContentHasher::new();
        let hash = |path: &Path| {
            if path.ends_with("broken.txt") {
                return Err(HashError::Read {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("device error"),
                });
            }
            hasher.hash_file(path)
        };

        let walk = WalkDirScanner::new().walk(&source).unwrap();
        let root = walk.root().to_path_buf();
        let report = duplicates_only(&source, &destination)
            .build()
            .sort(root, walk, &hash, &null_sender())
            .unwrap();

        assert_eq!(report.total_files, 21);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].path.ends_with("broken.txt"));
        assert!(report.errors[0].message.contains("device error"));
        assert_eq!(report.sorted.len(), 5);
        assert_eq!(report.duplicates.len(), 15);
        assert!(!destination.join("Data").join("broken.txt").exists());
    }

    #[test]
    fn scan_failure_mid_walk_aborts_the_run() {
        let (_temp, source, destination) = dirs();
        let root = fs::canonicalize(&source).unwrap();
        let mut entries = Vec::new();
        for i in 0..(QUEUE_CAPACITY * 2) {
            let path = root.join(format!("f{}.bin", i));
            fs::write(&path, format!("{}", i)).unwrap();
            entries.push(Ok(path));
        }
        entries.push(Err(ScanError::PermissionDenied {
            path: root.join("locked"),
        }));
        let hasher = ContentHasher::new();

        let result = duplicates_only(&source, &destination)
            .workers(1)
            .copy_duplicates(true)
            .build()
            .sort(
                root,
                entries.into_iter(),
                &|path: &Path| hasher.hash_file(path),
                &null_sender(),
            );

        assert!(matches!(
            result,
            Err(SortError::Scan(ScanError::PermissionDenied { .. }))
        ));
    }

    #[test]
    fn destination_inside_source_is_rejected() {
        let (_temp, source, _destination) = dirs();
        let nested = source.join("out");
        fs::create_dir_all(&nested).unwrap();

        let result = duplicates_only(&source, &nested).build().run();

        assert!(matches!(result, Err(SortError::Config(_))));
    }

    #[test]
    fn run_emits_lifecycle_events() {
        let (_temp, source, destination) = dirs();
        write(&source, "a.txt", b"a");
        write(&source, "b.txt", b"a");
        let (sender, receiver) = EventChannel::new();

        duplicates_only(&source, &destination)
            .build()
            .run_with_events(&sender)
            .unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert!(matches!(events.first(), Some(Event::Pipeline(PipelineEvent::Started))));
        assert!(matches!(
            events.last(),
            Some(Event::Pipeline(PipelineEvent::Completed { .. }))
        ));
        let duplicates = events
            .iter()
            .filter(|e| matches!(e, Event::Sort(SortEvent::Duplicate { .. })))
            .count();
        assert_eq!(duplicates, 1);
    }
}
