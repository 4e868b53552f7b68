//! # Trust Diary Trust
//!
//! The trust list and per-recipient encryption.
//!
//! ## Trust Model
//!
//! A peer is trusted when an administrator records its signing key, its
//! encryption key and a permission set in the [`TrustStore`]. There are no
//! groups and no shared keys: every protected payload is sealed separately
//! for each recipient with [`Sealed::seal`].
//!
//! ## Encryption
//!
//! - X25519 static key agreement between holder and recipient
//! - BLAKE3 key derivation bound to both public keys
//! - XChaCha20-Poly1305 with a fresh random 24-byte nonce per message
//!
//! Keys are long-lived. There is no forward secrecy and no rotation beyond
//! re-trusting a signing key with a new encryption key.

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod store;

pub use crypto::{EncryptionKey, SealNonce, SharedKey, NONCE_LEN};
pub use envelope::Sealed;
pub use error::{Result, TrustError};
pub use store::TrustStore;
