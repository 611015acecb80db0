//! Propagation error types.

use std::time::Duration;

use common::{CustomerError, CustomerId};
use queue::QueueError;
use read_model::ReadStoreError;
use thiserror::Error;
use write_store::WriteStoreError;

/// Errors that can occur while creating or republishing a customer.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The input was rejected before anything was written.
    #[error("Invalid customer: {0}")]
    Validation(#[from] CustomerError),

    /// The write store failed; nothing was published.
    #[error("Failed to persist customer: {0}")]
    Persistence(#[from] WriteStoreError),

    /// The row exists but its identifier never reached the queue.
    #[error("Customer {customer_id} was saved but not published: {source}")]
    PropagationGap {
        customer_id: CustomerId,
        #[source]
        source: QueueError,
    },

    /// No row exists for the identifier.
    #[error("Customer not found: {0}")]
    NotFound(CustomerId),
}

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WriteStore,
    ReadStore,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WriteStore => "write_store",
            Stage::ReadStore => "read_store",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store failure that may succeed on redelivery.
#[derive(Debug, Clone, Error)]
#[error("Transient {stage} failure: {message}")]
pub struct TransientFailure {
    pub stage: Stage,
    pub message: String,
    /// Delay the store asked for, when it gave one.
    pub retry_after: Option<Duration>,
}

impl TransientFailure {
    pub fn write_store(err: &WriteStoreError) -> Self {
        Self {
            stage: Stage::WriteStore,
            message: err.to_string(),
            retry_after: None,
        }
    }

    pub fn read_store(err: &ReadStoreError) -> Self {
        let retry_after = match err {
            ReadStoreError::Throttled { retry_after } => Some(*retry_after),
            _ => None,
        };
        Self {
            stage: Stage::ReadStore,
            message: err.to_string(),
            retry_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_keeps_retry_hint() {
        let failure = TransientFailure::read_store(&ReadStoreError::Throttled {
            retry_after: Duration::from_millis(300),
        });
        assert_eq!(failure.stage, Stage::ReadStore);
        assert_eq!(failure.retry_after, Some(Duration::from_millis(300)));
    }

    #[test]
    fn gap_message_names_the_customer() {
        let err = ProducerError::PropagationGap {
            customer_id: CustomerId::new(7),
            source: QueueError::Unavailable("down".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Customer 7 was saved but not published: Queue unavailable: down"
        );
    }
}
