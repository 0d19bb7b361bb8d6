//! # Pipeline Module
//!
//! Orchestrates a full sort run.
//!
//! ## Stages
//! 1. **Scan** - Discover every regular file under the source folder
//! 2. **Hash** - MD5 of each file's content, on a worker pool
//! 3. **Classify** - First occurrence of a hash is unique, later ones are duplicates
//! 4. **Place** - Resolve a destination and copy, on a second worker pool
//! 5. **Aggregate** - Collect one outcome per file, then write the reports
//!
//! ## Concurrency
//! Stages are joined by bounded crossbeam queues. The duplicate index and
//! the result lists each have a single owning loop, so neither needs a lock.
//! The run ends when the aggregator has seen as many outcomes as the scanner
//! discovered files.

mod aggregator;
mod classifier;
mod executor;
mod types;

pub use aggregator::{Aggregator, Tally};
pub use classifier::{Decision, DuplicateClassifier};
pub use executor::{default_workers, Pipeline, PipelineBuilder, PipelineConfig, QUEUE_CAPACITY};
pub use types::{DuplicateFile, DuplicateGroup, ErrorRecord, Outcome, RunReport, SortedFile};
