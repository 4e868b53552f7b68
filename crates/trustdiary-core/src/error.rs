//! Error types for the Trust Diary core.

use thiserror::Error;

/// Core errors that can occur while handling keys, entries and encodings.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("entry is not signed")]
    MissingSignature,

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    /// Persisted key material does not derive the persisted public keys.
    #[error("identity mismatch: {0}")]
    IdentityMismatch(String),

    #[error("unknown permission: {0}")]
    InvalidPermission(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
