//! Rotating identity provider
//!
//! Each lightweight fetch attempt presents a user agent drawn at random from a
//! weighted pool, so retries against the same origin do not carry an
//! identical client fingerprint.

use rand::distributions::{Distribution, WeightedIndex};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// User agent used when nothing else is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Built-in pool, weighted roughly by desktop browser share
const BUILTIN_POOL: &[(&str, f64)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        32.0,
    ),
    (DEFAULT_USER_AGENT, 14.0),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        6.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.51",
        11.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        7.0,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0",
        3.0,
    ),
    (
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        2.0,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        9.0,
    ),
];

/// Errors raised while building an identity pool
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity pool is empty")]
    EmptyPool,

    #[error("Invalid identity weights: {0}")]
    InvalidWeights(#[from] rand::distributions::WeightedError),

    #[error("Failed to read identity file: {0}")]
    Csv(#[from] csv::Error),
}

/// Supplies one client identity (user agent string) per request
pub trait IdentityProvider: Send + Sync {
    /// Returns the identity for the next request
    fn next(&self) -> String;
}

/// One row of a user agent CSV file
#[derive(Debug, Deserialize)]
struct IdentityRow {
    user_agent: String,
    #[serde(default)]
    weight: Option<f64>,
}

/// Weighted-random identity pool
///
/// The pool itself is immutable after construction and sampling uses the
/// thread-local RNG, so `next()` needs no lock.
#[derive(Debug, Clone)]
pub struct RotatingIdentity {
    identities: Vec<String>,
    weights: WeightedIndex<f64>,
}

impl RotatingIdentity {
    /// Creates a pool from `(identity, weight)` pairs
    pub fn new<I, S>(entries: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (identities, weights): (Vec<String>, Vec<f64>) = entries
            .into_iter()
            .map(|(identity, weight)| (identity.into(), weight))
            .filter(|(identity, _)| !identity.trim().is_empty())
            .unzip();

        if identities.is_empty() {
            return Err(IdentityError::EmptyPool);
        }

        let weights = WeightedIndex::new(weights)?;
        Ok(Self {
            identities,
            weights,
        })
    }

    /// Creates the built-in pool of desktop browser user agents
    pub fn builtin() -> Result<Self, IdentityError> {
        Self::new(BUILTIN_POOL.iter().copied())
    }

    /// Loads a pool from a CSV file with an `id,user_agent[,weight]` header
    ///
    /// Rows without a weight count with weight 1.
    pub fn from_csv(path: &Path) -> Result<Self, IdentityError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut entries = Vec::new();
        for row in reader.deserialize::<IdentityRow>() {
            let row = row?;
            entries.push((row.user_agent, row.weight.unwrap_or(1.0)));
        }

        tracing::debug!("Loaded {} user agents from {}", entries.len(), path.display());
        Self::new(entries)
    }

    /// Number of identities in the pool
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl IdentityProvider for RotatingIdentity {
    fn next(&self) -> String {
        let index = self.weights.sample(&mut rand::thread_rng());
        self.identities[index].clone()
    }
}
