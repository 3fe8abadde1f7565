//! Fetch error taxonomy and the earnings source trait.
//!
//! The EarningsSource trait lets the batch driver run either provider and
//! lets tests substitute a canned source.

use crate::domain::{DateRange, EarningsEvent};
use thiserror::Error;

/// Why a single HTTP attempt failed. Every variant is retryable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AttemptError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed JSON: {0}")]
    Decode(String),
}

/// Failure of a whole fetch operation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A page kept failing until the attempt budget ran out.
    #[error("request failed after {attempts} attempt(s) for {url}: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: AttemptError,
    },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

impl FetchError {
    /// The (credential-redacted) URL the failure refers to, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Exhausted { url, .. } | FetchError::InvalidUrl { url, .. } => Some(url),
            FetchError::ClientSetup(_) => None,
        }
    }
}

/// A provider that can list earnings events for one ticker.
pub trait EarningsSource {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// All events for `ticker` reported within `range`.
    ///
    /// An empty vector is a valid "no data" answer, not an error.
    fn fetch_earnings(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Vec<EarningsEvent>, FetchError>;
}
