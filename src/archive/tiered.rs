//! Tiered fetch state machine
//!
//! Drives one bookmark from `Lightweight(1)` to `Done` or `Failed`:
//! - a transport error on the lightweight tier is fatal
//! - a 2xx response is done
//! - 403 and 503 back off and retry the lightweight tier while attempts and
//!   backoff budget remain
//! - anything else, or a throttled last attempt, falls back to one heavyweight render
//! - a done state with an empty body is a failure

use crate::archive::backoff::Backoff;
use crate::config::ArchiverConfig;
use crate::fetch::{FetchError, FetchOutcome, PageFetcher, Tier};
use crate::identity::IdentityProvider;
use crate::state::{FailedFetch, FetchFailure, FetchState, FetchedPage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Statuses meaning the origin is throttling or temporarily blocking us
pub const RETRYABLE_STATUSES: [u16; 2] = [403, 503];

pub fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// The two fetchers, selected explicitly by the state machine
#[derive(Clone)]
pub struct Tiers {
    pub lightweight: Arc<dyn PageFetcher>,
    pub heavyweight: Arc<dyn PageFetcher>,
}

/// Retry limits of the lightweight tier
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_lightweight_attempts: u32,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl From<&ArchiverConfig> for RetryPolicy {
    fn from(config: &ArchiverConfig) -> Self {
        Self {
            max_lightweight_attempts: config.max_lightweight_attempts,
            backoff_initial: config.backoff_initial(),
            backoff_max: config.backoff_max(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ArchiverConfig::default())
    }
}

fn finish(outcome: FetchOutcome, tier: Tier, attempts: u32) -> FetchState {
    if outcome.body.is_empty() {
        FetchState::Failed {
            error: FetchFailure::EmptyBody,
            attempts,
        }
    } else {
        FetchState::Done {
            body: outcome.body,
            tier,
            attempts,
        }
    }
}

/// Runs the state machine for `url` until it is done or has failed
pub async fn fetch_tiered(
    tiers: &Tiers,
    identity: &dyn IdentityProvider,
    policy: &RetryPolicy,
    url: &Url,
    cancel: &CancellationToken,
) -> Result<FetchedPage, FailedFetch> {
    let mut backoff = Backoff::new(policy.backoff_initial, policy.backoff_max);
    let mut state = FetchState::start();

    loop {
        state = match state {
            FetchState::Lightweight { attempt } => {
                let agent = identity.next();
                match tiers
                    .lightweight
                    .fetch(url, Some(agent.as_str()), cancel)
                    .await
                {
                    Err(e) => FetchState::Failed {
                        error: FetchFailure::Fetch(e),
                        attempts: attempt,
                    },
                    Ok(outcome) if outcome.is_success() => {
                        if attempt > 1 {
                            tracing::debug!(
                                "Retrieved {} after {} lightweight attempts",
                                url,
                                attempt
                            );
                        }
                        finish(outcome, Tier::Lightweight, attempt)
                    }
                    Ok(outcome)
                        if is_retryable(outcome.status_code)
                            && attempt < policy.max_lightweight_attempts
                            && !backoff.is_exhausted() =>
                    {
                        tracing::warn!(
                            "{} answered {} (attempt {}), backing off",
                            url,
                            outcome.status_code,
                            attempt
                        );
                        FetchState::Backoff { attempt }
                    }
                    Ok(outcome) => {
                        tracing::debug!(
                            "{} answered {} (attempt {}, {:?} backed off), falling back to the headless browser",
                            url,
                            outcome.status_code,
                            attempt,
                            backoff.total()
                        );
                        FetchState::Heavy { attempts: attempt }
                    }
                }
            }

            FetchState::Backoff { attempt } => match backoff.wait(cancel).await {
                Some(delay) => {
                    tracing::debug!("Waited {:?} before retrying {}", delay, url);
                    FetchState::Lightweight {
                        attempt: attempt + 1,
                    }
                }
                None => FetchState::Failed {
                    error: FetchFailure::Fetch(FetchError::Cancelled),
                    attempts: attempt,
                },
            },

            FetchState::Heavy { attempts } => {
                let attempts = attempts + 1;
                match tiers.heavyweight.fetch(url, None, cancel).await {
                    Ok(outcome) if outcome.is_success() => {
                        finish(outcome, Tier::Heavyweight, attempts)
                    }
                    Ok(outcome) => FetchState::Failed {
                        error: FetchFailure::Fetch(FetchError::Status {
                            status: outcome.status_code,
                        }),
                        attempts,
                    },
                    Err(e) => FetchState::Failed {
                        error: FetchFailure::Fetch(e),
                        attempts,
                    },
                }
            }

            FetchState::Done {
                body,
                tier,
                attempts,
            } => {
                return Ok(FetchedPage {
                    body,
                    tier,
                    attempts,
                })
            }

            FetchState::Failed { error, attempts } => {
                return Err(FailedFetch { error, attempts })
            }
        };

        tracing::trace!("{} -> {}", url, state);
    }
}
