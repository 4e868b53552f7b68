//! Error types for the store module.

use thiserror::Error;
use trustdiary_core::CoreError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record that may only be written once already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid data in storage (wrong blob length, unparseable column).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Stored key material or values rejected by the core types.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The blocking worker running a database call failed.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
