//! Error kinds raised by the rate and history core.

use std::time::Duration;
use thiserror::Error;

/// Bad user input. Raised before any network or storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// A single failed attempt to reach the price endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("Request error: {0}")]
    Network(String),
    #[error("Rate limit reached")]
    RateLimit,
    #[error("HTTP {0}")]
    Http(u16),
    #[error("Invalid rate data: {0}")]
    InvalidData(String),
}

/// No market rate could be produced: the fetch failed and nothing was cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot fetch market rate. Check internet connection. ({cause})")]
pub struct NetworkError {
    #[source]
    pub cause: FetchError,
}

/// Failure reported by a [`KeyValueStore`](crate::core::store::KeyValueStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Storage quota exceeded writing {key}: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Failed to serialize value for {key}: {message}")]
    Serialization { key: String, message: String },
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// A write to persistent storage could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to save to {what}: {source}")]
pub struct PersistenceError {
    pub what: &'static str,
    #[source]
    pub source: StoreError,
}

/// Everything a [`Session`](crate::core::session::Session) can report back to
/// the presentation layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
