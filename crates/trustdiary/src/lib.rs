//! # Trust Diary
//!
//! A signed, append-only diary shared only with readers its holder trusts.
//!
//! ## Overview
//!
//! - **Identity**: one Ed25519 signing key and one X25519 encryption key,
//!   created on first run and never rotated
//! - **Trust list**: reader signing keys mapped to their encryption key,
//!   display name and permissions
//! - **Entry log**: append-only entries signed by the holder
//! - **Sync**: readers meet the holder on a rendezvous channel derived from
//!   its signing key, prove their key with a signed challenge, and receive
//!   entries sealed individually for them
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trustdiary::{Diary, DiaryConfig};
//! use trustdiary::core::{NewEntry, PermissionSet, PublicIdentity};
//! use trustdiary::store::SqliteStore;
//! use trustdiary::sync::memory::MemoryNetwork;
//!
//! async fn example(reader: PublicIdentity) {
//!     let store = Arc::new(SqliteStore::open("diary.db").unwrap());
//!     let diary = Diary::open(store, DiaryConfig::default()).await.unwrap();
//!
//!     diary.trust_reader(reader, "Bea", PermissionSet::read_only()).await.unwrap();
//!     diary.append(NewEntry::new("Hello").title("Day one")).await.unwrap();
//!
//!     let network = MemoryNetwork::new();
//!     let engine = diary.serve(Arc::new(network.join(diary.room_id())));
//!
//!     // ... readers join the same room
//!     engine.shutdown().await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `trustdiary::core` - Keys, identities, entries, trust records, rendezvous ids
//! - `trustdiary::store` - Storage abstraction, SQLite and the entry log
//! - `trustdiary::trust` - Trust list and per-recipient sealing
//! - `trustdiary::sync` - Sessions, transports, holder engine and reader

pub mod config;
pub mod diary;
pub mod error;
pub mod identity;

// Re-export component crates
pub use trustdiary_core as core;
pub use trustdiary_store as store;
pub use trustdiary_sync as sync;
pub use trustdiary_trust as trust;

pub use config::DiaryConfig;
pub use diary::{Diary, DiaryStatus};
pub use error::{DiaryError, Result};
pub use identity::IdentityManager;

// Re-export commonly used types
pub use trustdiary_core::{
    DiaryEntry, Ed25519PublicKey, Identity, NewEntry, Permission, PermissionSet, PublicIdentity,
    RendezvousId, TrustRecord,
};
pub use trustdiary_sync::{EngineHandle, Reader, ReaderConfig, ReaderHandle, SessionState};
