//! # sort-it CLI
//!
//! Sorts an unorganized folder into a destination layout.
//!
//! ## Usage
//! ```bash
//! sort-it ~/Unsorted ~/Sorted --copy-duplicates
//! sort-it ~/Unsorted ~/Sorted --multimedia-only --verbose
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
