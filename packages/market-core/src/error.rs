//! Typed errors for the market-core library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Per-record failures
//! (`NormalizeError`) are isolated by the ingest pipeline and never abort a
//! batch; storage failures surface as `StoreError` and are not retried here.

use thiserror::Error;

/// Errors produced while normalizing a single raw record.
///
/// All variants are per-record: the caller drops the record, logs the
/// reason, and continues with the rest of the batch. Unrecognized category
/// or condition text is deliberately *not* an error; those fall back to
/// `Category::Other` / `Condition::Good` with a confidence flag.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NormalizeError {
    /// Record is missing part of its dedup identity
    #[error("record missing identity field: {field}")]
    MissingIdentity { field: &'static str },

    /// Platform string did not match any known marketplace
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// Price text was malformed, negative, or above the sanity ceiling
    #[error("invalid price: {text:?}")]
    InvalidPrice { text: String },
}

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failure (connection, query, pool). The core never
    /// retries these; retry policy belongs to the caller.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored row could not be decoded back into a domain type
    #[error("stored row corrupt: {0}")]
    Corrupt(String),

    /// JSON (de)serialization of a stored payload failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap an arbitrary backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Result type alias for normalization.
pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
