//! Errors of the persistence layer.

use thiserror::Error;

/// Errors that can occur while reading or writing rules and notifications.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The database rejected or failed the operation.
    #[error("A data store operation failed: {0}")]
    OperationFailed(String),

    /// The requested row does not exist.
    #[error("The requested item was not found: {0}")]
    NotFound(String),

    /// A stored value could not be converted into its model type.
    #[error("Failed to serialize or deserialize data: {0}")]
    Serialization(String),

    /// Applying the schema migrations failed.
    #[error("A data migration failed: {0}")]
    Migration(String),

    /// The connection string or an argument is invalid.
    #[error("An invalid configuration or input was provided: {0}")]
    InvalidInput(String),

    /// A unique constraint rejected the write.
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::NotFound(error.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::AlreadyExists(db.message().to_string()),
            _ => Self::OperationFailed(error.to_string()),
        }
    }
}
