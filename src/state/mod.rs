//! State module for tracking archive progress
//!
//! This module provides state management for bookmarks during a run.
//!
//! # Components
//!
//! - `FetchState`: Tracks one bookmark through the tiered fetch (lightweight, backoff, heavy, done, failed)
//! - `RunProgress`: Shared counters for a bulk run, logged periodically
//! - `RunSummary`: Final counts returned by a bulk run

mod fetch_state;
mod progress;

// Re-export main types
pub use fetch_state::{FailedFetch, FetchFailure, FetchState, FetchedPage};
pub use progress::{RunProgress, RunSummary, PROGRESS_INTERVAL};
