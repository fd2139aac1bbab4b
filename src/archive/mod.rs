//! Archive pipeline
//!
//! This module contains the fetch-and-archive core:
//! - `WorkerPool`: bounded-concurrency task scheduler isolating task failures
//! - `HostRateLimiters`: lazily created per-host token buckets
//! - `Backoff`: jittered exponential delays between throttled attempts
//! - `fetch_tiered`: the lightweight/backoff/heavyweight state machine
//! - `Archiver`: dedup, scheduling, extraction, tagging and persistence

mod backoff;
mod coordinator;
mod limiter;
mod pool;
mod tiered;

pub use backoff::Backoff;
pub use coordinator::{ArchiveOutcome, Archiver, Collaborators};
pub use limiter::{acquire, HostLimiter, HostRateLimiters};
pub use pool::{PoolError, WorkerPool};
pub use tiered::{fetch_tiered, is_retryable, RetryPolicy, Tiers, RETRYABLE_STATUSES};
