//! Error types shared across the feed aggregator

use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider fetch
///
/// Every upstream failure is converted into one of these variants; providers
/// never panic on malformed payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream throttling
    #[error("Rate limited{}", retry_suffix(.retry_after))]
    RateLimited {
        /// Backoff hint taken from the upstream response, if any
        retry_after: Option<Duration>,
    },

    /// Payload did not match the expected schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or rejected credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(" (retry after {}s)", d.as_secs()))
        .unwrap_or_default()
}

/// Coarse classification of a [`FetchError`], used by callers to pick a
/// retry or display policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    RateLimited,
    InvalidResponse,
    Unauthorized,
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        FetchError::Network(msg.into())
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        FetchError::RateLimited { retry_after }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        FetchError::InvalidResponse(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        FetchError::Unauthorized(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::RateLimited { .. } => ErrorKind::RateLimited,
            FetchError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            FetchError::Unauthorized(_) => ErrorKind::Unauthorized,
        }
    }

    /// Whether a caller may retry the same request later
    ///
    /// The aggregator itself never retries; this only informs the caller's
    /// backoff policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::RateLimited)
    }

    /// Whether the user has to act (e.g. fix an API key) before a retry can succeed
    pub fn is_user_actionable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unauthorized)
    }

    /// Backoff hint for rate-limited responses
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A feed item violated the normalization contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("Feed item id must not be empty")]
    EmptyId,

    #[error("Feed item {0} has an empty title")]
    EmptyTitle(String),
}

impl From<ItemError> for FetchError {
    fn from(err: ItemError) -> Self {
        FetchError::InvalidResponse(err.to_string())
    }
}

/// A query descriptor was out of range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Page numbers start at 1")]
    ZeroPage,

    #[error("Page size must be between 1 and {max}, got {got}")]
    PageSize { got: u32, max: u32 },
}

/// Result type alias for provider fetches
pub type FetchResult<T> = Result<T, FetchError>;
