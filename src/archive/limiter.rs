//! Per-host rate limiting
//!
//! One token bucket per destination host, created on first use and kept for
//! the rest of the run. Creation goes through the map's entry API, so two
//! workers racing on a new host still end up sharing a single limiter.

use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared limiter for one host
pub type HostLimiter = Arc<DefaultDirectRateLimiter>;

/// Registry of host limiters for one run
pub struct HostRateLimiters {
    limiters: DashMap<String, HostLimiter>,
    quota: Quota,
}

impl HostRateLimiters {
    /// Creates an empty registry allowing `per_second` requests per host
    ///
    /// The bucket holds a single token, so requests to one host are spaced
    /// evenly instead of bursting.
    pub fn new(per_second: NonZeroU32) -> Self {
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_second(per_second).allow_burst(NonZeroU32::MIN),
        }
    }

    /// Returns the limiter of `host`, creating it if needed
    pub fn limiter(&self, host: &str) -> HostLimiter {
        if let Some(existing) = self.limiters.get(host) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .limiters
            .entry(host.to_string())
            .or_insert_with(|| {
                tracing::trace!("Creating rate limiter for {}", host);
                Arc::new(RateLimiter::direct(self.quota))
            });
        Arc::clone(entry.value())
    }

    /// Waits for a token of `host`
    ///
    /// Returns false if `cancel` fired first.
    pub async fn take(&self, host: &str, cancel: &CancellationToken) -> bool {
        acquire(&self.limiter(host), cancel).await
    }

    /// Number of hosts seen so far
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

/// Waits for a token of `limiter`; false if `cancel` fired first
pub async fn acquire(limiter: &DefaultDirectRateLimiter, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = limiter.until_ready() => true,
    }
}
