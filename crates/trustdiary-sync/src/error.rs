//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// None of these are ever reported to the remote peer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An inbound frame did not parse as a wire message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine or reader task has stopped.
    #[error("sync task stopped")]
    Stopped,

    /// Sealing or opening a payload failed.
    #[error("trust error: {0}")]
    Trust(#[from] trustdiary_trust::TrustError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] trustdiary_store::StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] trustdiary_core::CoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
