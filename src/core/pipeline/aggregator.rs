//! Result aggregation.

use super::types::{DuplicateFile, ErrorRecord, Outcome, RunReport, SortedFile};
use crate::core::scanner::ScannedFile;
use crate::error::PipelineError;
use crate::events::{Event, EventSender, SortEvent, SortProgress};
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Messages consumed by the aggregator
#[derive(Debug)]
pub enum Tally {
    /// One file reached its terminal state
    Outcome(Outcome),
    /// The scanner finished; this many outcomes will arrive in total
    Expect(usize),
}

/// Sole owner of the result lists.
///
/// Completion is reached when the number of recorded outcomes equals the
/// expected total announced after the scan finished.
#[derive(Debug, Default)]
pub struct Aggregator {
    sorted: Vec<SortedFile>,
    duplicates: Vec<DuplicateFile>,
    errors: Vec<ErrorRecord>,
    excluded: Vec<ScannedFile>,
    observed: usize,
    expected: Option<usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome to exactly one list
    pub fn record(&mut self, outcome: Outcome) {
        self.observed += 1;
        match outcome {
            Outcome::Sorted(file) => self.sorted.push(file),
            Outcome::Duplicate(file) => self.duplicates.push(file),
            Outcome::Error(record) => self.errors.push(record),
            Outcome::Excluded(file) => self.excluded.push(file),
        }
    }

    /// Set the expected total
    pub fn set_expected(&mut self, total: usize) -> Result<(), PipelineError> {
        self.expected = Some(total);
        self.check_overflow()
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn is_complete(&self) -> bool {
        self.expected == Some(self.observed)
    }

    fn check_overflow(&self) -> Result<(), PipelineError> {
        match self.expected {
            Some(expected) if self.observed > expected => Err(PipelineError::OutcomeMismatch {
                expected,
                observed: self.observed,
            }),
            _ => Ok(()),
        }
    }

    /// Drain `tally` until every expected outcome has arrived.
    ///
    /// A disconnect before completion means a stage lost files.
    pub fn collect(
        mut self,
        tally: &Receiver<Tally>,
        events: &EventSender,
        discovered: &AtomicUsize,
    ) -> Result<Self, PipelineError> {
        while !self.is_complete() {
            match tally.recv() {
                Ok(Tally::Outcome(outcome)) => {
                    emit(events, &outcome);
                    self.record(outcome);
                    events.send(Event::Sort(SortEvent::Progress(SortProgress {
                        processed: self.observed,
                        total_discovered: discovered.load(Ordering::SeqCst),
                    })));
                    self.check_overflow()?;
                }
                Ok(Tally::Expect(total)) => {
                    debug!(total, observed = self.observed, "expected total known");
                    self.set_expected(total)?;
                }
                Err(_) => {
                    return Err(PipelineError::OutcomeMismatch {
                        expected: self
                            .expected
                            .unwrap_or_else(|| discovered.load(Ordering::SeqCst)),
                        observed: self.observed,
                    })
                }
            }
        }
        Ok(self)
    }

    /// Sort every list by source path and produce the run report
    pub fn finish(
        mut self,
        id: Uuid,
        source: PathBuf,
        destination: PathBuf,
        duration_ms: u64,
    ) -> RunReport {
        self.sorted.sort_by(|a, b| a.path.cmp(&b.path));
        self.duplicates.sort_by(|a, b| a.path.cmp(&b.path));
        self.errors.sort_by(|a, b| a.path.cmp(&b.path));
        self.excluded.sort_by(|a, b| a.path.cmp(&b.path));

        RunReport {
            id,
            source,
            destination,
            total_files: self.observed,
            sorted: self.sorted,
            duplicates: self.duplicates,
            errors: self.errors,
            excluded: self.excluded,
            duration_ms,
        }
    }
}

fn emit(events: &EventSender, outcome: &Outcome) {
    let event = match outcome {
        Outcome::Sorted(file) => {
            debug!(path = %file.path.display(), destination = %file.destination, "placed");
            SortEvent::Placed {
                path: file.path.clone(),
                destination: PathBuf::from(&file.destination),
            }
        }
        Outcome::Duplicate(file) => {
            debug!(path = %file.path.display(), canonical = %file.canonical_path, "duplicate");
            SortEvent::Duplicate {
                path: file.path.clone(),
                hash: file.hash.clone(),
            }
        }
        Outcome::Error(record) => {
            warn!(path = %record.path.display(), error = %record.message, "file failed");
            SortEvent::Error {
                path: record.path.clone(),
                message: record.message.clone(),
            }
        }
        Outcome::Excluded(file) => {
            debug!(path = %file.path.display(), "excluded");
            SortEvent::Excluded {
                path: file.path.clone(),
            }
        }
    };
    events.send(Event::Sort(event));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{null_sender, EventChannel};
    use crossbeam_channel::unbounded;
    use std::path::Path;

    fn error(path: &str) -> Outcome {
        Outcome::Error(ErrorRecord {
            path: PathBuf::from(path),
            message: "boom".to_string(),
        })
    }

    fn sorted(path: &str) -> Outcome {
        Outcome::Sorted(SortedFile {
            path: PathBuf::from(path),
            relative_path: path.trim_start_matches('/').to_string(),
            hash: path.to_string(),
            destination: format!("Data{}", path),
        })
    }

    #[test]
    fn each_outcome_lands_in_exactly_one_list() {
        let mut aggregator = Aggregator::new();
        aggregator.record(sorted("/a"));
        aggregator.record(error("/b"));
        aggregator.record(Outcome::Excluded(ScannedFile::new(
            PathBuf::from("/src/c"),
            Path::new("/src"),
        )));

        let report = aggregator.finish(Uuid::nil(), "/src".into(), "/dest".into(), 0);

        assert_eq!(report.total_files, 3);
        assert_eq!(report.sorted.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.excluded.len(), 1);
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn lists_are_sorted_by_path() {
        let mut aggregator = Aggregator::new();
        for path in ["/c", "/a", "/b"] {
            aggregator.record(sorted(path));
        }

        let report = aggregator.finish(Uuid::nil(), "/src".into(), "/dest".into(), 0);
        let paths: Vec<_> = report.sorted.iter().map(|f| f.path.clone()).collect();

        assert_eq!(paths, vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]);
    }

    #[test]
    fn collect_completes_without_waiting_for_disconnect() {
        let (tx, rx) = unbounded();
        tx.send(Tally::Outcome(sorted("/a"))).unwrap();
        tx.send(Tally::Outcome(error("/b"))).unwrap();
        tx.send(Tally::Expect(2)).unwrap();

        let aggregator = Aggregator::new()
            .collect(&rx, &null_sender(), &AtomicUsize::new(2))
            .unwrap();

        assert!(aggregator.is_complete());
        assert_eq!(aggregator.observed(), 2);
        // The sender is still alive: completion did not depend on disconnect.
        drop(tx);
    }

    #[test]
    fn empty_run_completes_immediately() {
        let (tx, rx) = unbounded();
        tx.send(Tally::Expect(0)).unwrap();

        let aggregator = Aggregator::new()
            .collect(&rx, &null_sender(), &AtomicUsize::new(0))
            .unwrap();

        assert_eq!(aggregator.observed(), 0);
    }

    #[test]
    fn disconnect_before_completion_is_a_mismatch() {
        let (tx, rx) = unbounded();
        tx.send(Tally::Expect(2)).unwrap();
        tx.send(Tally::Outcome(sorted("/a"))).unwrap();
        drop(tx);

        let result = Aggregator::new().collect(&rx, &null_sender(), &AtomicUsize::new(2));

        assert!(matches!(
            result,
            Err(PipelineError::OutcomeMismatch { expected: 2, observed: 1 })
        ));
    }

    #[test]
    fn more_outcomes_than_expected_is_a_mismatch() {
        let mut aggregator = Aggregator::new();
        aggregator.record(sorted("/a"));
        aggregator.record(sorted("/b"));

        assert!(aggregator.set_expected(1).is_err());
    }

    #[test]
    fn collect_emits_outcome_and_progress_events() {
        let (sender, receiver) = EventChannel::new();
        let (tx, rx) = unbounded();
        tx.send(Tally::Expect(1)).unwrap();
        tx.send(Tally::Outcome(error("/x"))).unwrap();

        Aggregator::new()
            .collect(&rx, &sender, &AtomicUsize::new(1))
            .unwrap();

        drop(sender);
        let events: Vec<Event> = receiver.iter().collect();
        assert!(matches!(events[0], Event::Sort(SortEvent::Error { .. })));
        match &events[1] {
            Event::Sort(SortEvent::Progress(progress)) => {
                assert_eq!(progress.processed, 1);
                assert_eq!(progress.total_discovered, 1);
            }
            other => panic!("expected progress, got {:?}", other),
        }
    }
}
