//! SQLite implementation of [`AppRepository`](crate::persistence::traits::AppRepository).

use std::str::FromStr;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

mod app_repository;

use crate::persistence::error::PersistenceError;

/// Rule and notification store backed by a SQLite connection pool.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Connects to `database_url`, creating the database file if it does not
    /// exist. Foreign keys are enforced so notifications cascade with their
    /// rule.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| PersistenceError::OperationFailed(format!("Failed to connect to database: {e}")))?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Applies the schema migrations under `migrations/`.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::Migration(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs `query_fn`, logging and converting any database error.
    async fn execute_query_with_error_handling<F, T>(&self, operation: &str, query_fn: F) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        query_fn.await.map_err(|e| {
            let error = PersistenceError::from(e);
            match &error {
                PersistenceError::AlreadyExists(_) => tracing::debug!(error = %error, operation, "Duplicate write rejected."),
                _ => tracing::error!(error = %error, operation, "Database operation failed."),
            }
            error
        })
    }
}
