use thiserror::Error;

/// Errors that can occur when interacting with the write store.
#[derive(Debug, Error)]
pub enum WriteStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The row was rejected by a table constraint.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The store could not be reached.
    #[error("Write store unavailable: {0}")]
    Unavailable(String),
}

/// SQLSTATE classes that describe the statement or its data rather than the
/// server's condition: data exceptions, integrity violations and
/// syntax or access rule violations.
const PERMANENT_SQLSTATE_CLASSES: &[&str] = &["22", "23", "42"];

impl WriteStoreError {
    /// Returns true when retrying the same operation later may succeed.
    ///
    /// Database errors count as transient unless they are known to be
    /// caused by the row or the statement itself.
    pub fn is_transient(&self) -> bool {
        match self {
            WriteStoreError::Unavailable(_) => true,
            WriteStoreError::Database(err) => is_transient_sqlx(err),
            WriteStoreError::Migration(_) | WriteStoreError::Constraint(_) => false,
        }
    }
}

fn is_transient_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Configuration(_)
        | sqlx::Error::RowNotFound
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_) => false,
        sqlx::Error::Database(db_err) => db_err.code().is_none_or(|code| {
            !PERMANENT_SQLSTATE_CLASSES
                .iter()
                .any(|class| code.starts_with(class))
        }),
        _ => true,
    }
}

/// Result type for write store operations.
pub type Result<T> = std::result::Result<T, WriteStoreError>;
