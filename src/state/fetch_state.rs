/// Tiered fetch state definitions
///
/// This module defines the states one bookmark moves through while its page
/// is being retrieved.
use crate::fetch::{FetchError, Tier};
use std::fmt;

/// Why a fetch ended in [`FetchState::Failed`]
#[derive(Debug)]
pub enum FetchFailure {
    /// A fetcher returned an error (transport, browser, cancellation)
    Fetch(FetchError),

    /// The final response carried no bytes
    EmptyBody,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::EmptyBody => write!(f, "empty body"),
        }
    }
}

/// Page retrieved by a finished tiered fetch
#[derive(Debug)]
pub struct FetchedPage {
    pub body: Vec<u8>,
    pub tier: Tier,
    /// Fetcher calls made across both tiers
    pub attempts: u32,
}

/// A tiered fetch that gave up
#[derive(Debug)]
pub struct FailedFetch {
    pub error: FetchFailure,
    pub attempts: u32,
}

/// Represents the current state of one bookmark's tiered fetch
///
/// `attempt` and `attempts` count fetcher calls made so far across both
/// tiers.
#[derive(Debug)]
pub enum FetchState {
    // ===== Active States =====
    /// About to make lightweight attempt number `attempt` (1-based)
    Lightweight { attempt: u32 },

    /// Lightweight attempt `attempt` was throttled; waiting before the next
    Backoff { attempt: u32 },

    /// Falling back to the headless browser after `attempts` calls
    Heavy { attempts: u32 },

    // ===== Terminal States =====
    /// Page bytes retrieved
    Done {
        body: Vec<u8>,
        tier: Tier,
        attempts: u32,
    },

    /// Fetch given up
    Failed { error: FetchFailure, attempts: u32 },
}

impl FetchState {
    /// Initial state of every fetch
    pub fn start() -> Self {
        Self::Lightweight { attempt: 1 }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lightweight { attempt } => write!(f, "lightweight({})", attempt),
            Self::Backoff { attempt } => write!(f, "backoff({})", attempt),
            Self::Heavy { attempts } => write!(f, "heavy(after {})", attempts),
            Self::Done { tier, attempts, .. } => write!(f, "done({}, {})", tier, attempts),
            Self::Failed { error, attempts } => write!(f, "failed({}, {})", attempts, error),
        }
    }
}
