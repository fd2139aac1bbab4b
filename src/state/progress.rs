//! Run progress counters
//!
//! Counters are shared by every worker of a bulk run and are advisory only:
//! nothing in the pipeline branches on them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Completions between two progress log lines
pub const PROGRESS_INTERVAL: u64 = 10;

/// Progress of one bulk run
#[derive(Debug)]
pub struct RunProgress {
    total: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    archived: AtomicU64,
    failed: AtomicU64,
    started: Instant,
}

impl RunProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            archived: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// A bookmark was already stored and not forced
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        self.advance();
    }

    /// A bookmark was fetched and persisted
    pub fn record_archived(&self) {
        self.archived.fetch_add(1, Ordering::Relaxed);
        self.advance();
    }

    /// A bookmark failed; the run continues
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.advance();
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    fn advance(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if completed % PROGRESS_INTERVAL == 0 {
            let rate = completed as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {}/{} bookmarks, {:.2} bookmarks/sec",
                completed,
                self.total(),
                rate
            );
        }
    }

    /// Snapshot of the counters
    pub fn summary(&self, cancelled: bool) -> RunSummary {
        RunSummary {
            total: self.total(),
            skipped: self.skipped.load(Ordering::Relaxed),
            archived: self.archived.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled,
        }
    }
}

/// Final counts of a bulk run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: u64,
    pub skipped: u64,
    pub archived: u64,
    pub failed: u64,
    pub cancelled: bool,
}

impl RunSummary {
    /// Bookmarks that reached a final outcome
    pub fn completed(&self) -> u64 {
        self.skipped + self.archived + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} bookmarks done ({} archived, {} skipped, {} failed){}",
            self.completed(),
            self.total,
            self.archived,
            self.skipped,
            self.failed,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}
