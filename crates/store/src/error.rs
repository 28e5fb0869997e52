use thiserror::Error;

use domain::StatusParseError;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored status string could not be parsed.
    #[error("Corrupt row: {0}")]
    Status(#[from] StatusParseError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
