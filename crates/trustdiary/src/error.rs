//! Error types for the diary service.

use thiserror::Error;
use trustdiary_core::CoreError;
use trustdiary_store::StoreError;
use trustdiary_sync::SyncError;
use trustdiary_trust::TrustError;

/// Errors that can occur during diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Trust list or sealing error.
    #[error("trust error: {0}")]
    Trust(#[from] TrustError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Result type for diary operations.
pub type Result<T> = std::result::Result<T, DiaryError>;
