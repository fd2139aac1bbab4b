//! Exponential backoff with jitter
//!
//! The n-th delay is `min(initial * 2^n, max)` scaled by a random factor in
//! `[0.5, 1.0]`. `max` also bounds the total time slept by one schedule: the
//! last delay is cut to what remains, after which the schedule is exhausted.

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Backoff schedule of one bookmark
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    retries: u32,
    slept: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            retries: 0,
            slept: Duration::ZERO,
        }
    }

    /// Delay of the next wait before jitter
    pub fn ceiling(&self) -> Duration {
        let factor = 1u32.checked_shl(self.retries).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Returns the next delay and advances the schedule
    ///
    /// The delay never exceeds the remaining budget; an exhausted schedule
    /// hands out zero.
    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling();
        self.retries = self.retries.saturating_add(1);
        let jitter: f64 = rand::thread_rng().gen_range(0.5..=1.0);
        let delay = ceiling.mul_f64(jitter).min(self.remaining());
        self.slept += delay;
        delay
    }

    /// Number of waits handed out so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Total delay handed out so far
    pub fn total(&self) -> Duration {
        self.slept
    }

    /// Budget left before the schedule is exhausted
    pub fn remaining(&self) -> Duration {
        self.max.saturating_sub(self.slept)
    }

    /// Returns true once the whole budget has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Sleeps for the next delay
    ///
    /// Returns the delay slept, or None if `cancel` fired first.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Option<Duration> {
        let delay = self.next_delay();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(delay) => Some(delay),
        }
    }
}
