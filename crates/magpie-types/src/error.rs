//! Error types for magpie.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for magpie operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that can occur while harvesting.
///
/// The taxonomy drives the retry policy and the supervisor:
///
/// - [`ResourceGone`](Self::ResourceGone) aborts the retry ladder and makes
///   the supervisor restart the whole harvest from scratch.
/// - [`RateLimited`](Self::RateLimited) and [`Transient`](Self::Transient)
///   are retried by the ladder and never reach callers on their own.
/// - [`Auth`](Self::Auth), [`Storage`](Self::Storage),
///   [`Internal`](Self::Internal) and [`Config`](Self::Config) terminate the
///   run; they are never retried and never trigger a restart.
#[derive(Error, Debug, Clone)]
pub enum HarvestError {
    /// The queried resource permanently no longer exists.
    #[error("resource gone: {0}")]
    ResourceGone(String),

    /// The upstream service throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other recoverable search failure (network, timeout, 5xx).
    #[error("transient failure: {0}")]
    Transient(String),

    /// Authentication could not be established for a worker.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The durable store could not be read or rewritten.
    #[error("storage failure: {0}")]
    Storage(String),

    /// A pipeline task failed outside the error taxonomy (panic, abort).
    #[error("internal error: {0}")]
    Internal(String),

    /// The harvest configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid day range.
    #[error(transparent)]
    Window(#[from] WindowError),
}

impl HarvestError {
    /// Returns true if the error must abort the retry ladder immediately.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ResourceGone(_) | Self::Storage(_))
    }

    /// Returns true if the supervisor should restart the whole harvest.
    #[must_use]
    pub const fn is_restartable(&self) -> bool {
        matches!(self, Self::ResourceGone(_))
    }

    /// Returns true if the upstream signalled request throttling.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Error for invalid day ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Start date is after end date.
    #[error("invalid date range: {start} > {end}")]
    InvalidRange {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },
}
