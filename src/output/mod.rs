//! Output module for reporting on the archive
//!
//! This module handles:
//! - Scanning the document store for statistics
//! - Printing a human-readable summary for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, ArchiveStatistics};
