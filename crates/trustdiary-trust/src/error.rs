//! Error types for the trust module.

use thiserror::Error;

/// Errors that can occur while sealing payloads or managing the trust list.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Authentication tag mismatch: wrong key, wrong nonce or tampered data.
    ///
    /// Callers drop the message.
    #[error("decryption failed")]
    Decryption,

    /// Persistence of the trust list failed.
    #[error("store error: {0}")]
    Store(#[from] trustdiary_store::StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] trustdiary_core::CoreError),
}

/// Result type for trust operations.
pub type Result<T> = std::result::Result<T, TrustError>;
