use thiserror::Error;

/// Errors a telemetry sink can report for a single write.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backend refused the record.
    #[error("Sink rejected record: {0}")]
    Rejected(String),

    /// Failed to serialize the record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
