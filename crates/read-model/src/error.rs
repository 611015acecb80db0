//! Read store error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when reading or writing projections.
#[derive(Debug, Error)]
pub enum ReadStoreError {
    /// The store rejected the request because of its rate limit.
    #[error("Request throttled, retry after {retry_after:?}")]
    Throttled { retry_after: Duration },

    /// The store could not be reached.
    #[error("Read store unavailable: {0}")]
    Unavailable(String),

    /// The document cannot be stored as given.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Failed to serialize a document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReadStoreError {
    /// Returns true when retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReadStoreError::Throttled { .. } | ReadStoreError::Unavailable(_)
        )
    }
}

/// Result type for read store operations.
pub type Result<T> = std::result::Result<T, ReadStoreError>;
