use thiserror::Error;

use crate::MessageId;

/// Errors that can occur when interacting with a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A wire body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The delivery's lease expired, or the message is already gone.
    #[error("Lease lost for message {0}")]
    LeaseLost(MessageId),

    /// The queue could not be reached.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
