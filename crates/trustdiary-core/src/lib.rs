//! # Trust Diary Core
//!
//! Pure primitives for Trust Diary: identities, diary entries, trust
//! records and rendezvous identifiers.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Identity`] - Ed25519 signing keypair plus X25519 encryption keypair
//! - [`DiaryEntry`] - An immutable, optionally signed log entry
//! - [`TrustRecord`] - Authorization of one peer signing key
//! - [`RendezvousId`] - Deterministic channel identifier
//!
//! ## Encoding
//!
//! Keys, signatures and nonces travel as standard base64. See [`encoding`].

pub mod crypto;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod identity;
pub mod rendezvous;
pub mod trust;
pub mod types;

pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, X25519PublicKey, X25519SecretKey};
pub use entry::{DiaryEntry, NewEntry};
pub use error::{CoreError, Result};
pub use identity::{Identity, IdentityRecord, PublicIdentity};
pub use rendezvous::{RendezvousId, DEFAULT_ROOM_SALT, PAIRWISE_ID_LEN, SERVICE_ID_LEN};
pub use trust::{Permission, PermissionSet, RosterEntry, TrustRecord};
pub use types::{now_millis, EntryId};
