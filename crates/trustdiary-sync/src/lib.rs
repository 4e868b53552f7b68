//! # Trust Diary Sync
//!
//! Challenge-response sessions and encrypted entry delivery.
//!
//! ## Overview
//!
//! A holder runs a [`SyncEngine`] on the rendezvous channel derived from its
//! signing key. Every peer that shows up is challenged; peers that prove a
//! trusted signing key receive the entry log and later announcements, each
//! sealed for their own encryption key. Everyone else receives nothing.
//!
//! Readers run a [`Reader`], which answers challenges and collects what the
//! holder sends.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trustdiary_sync::{memory::MemoryNetwork, Reader, ReaderConfig, Transport};
//! use trustdiary_core::{Identity, RendezvousId, DEFAULT_ROOM_SALT};
//!
//! async fn example(holder_key: trustdiary_core::Ed25519PublicKey) {
//!     let network = MemoryNetwork::new();
//!     let room = RendezvousId::service(DEFAULT_ROOM_SALT, &holder_key);
//!
//!     let reader = Reader::new(
//!         Arc::new(network.join(&room)),
//!         Arc::new(Identity::generate()),
//!         ReaderConfig::default().with_expected_holder(holder_key),
//!     )
//!     .spawn();
//!
//!     // ... later
//!     for entry in reader.entries() {
//!         println!("{}: {}", entry.id, entry.content);
//!     }
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Holder                              Reader
//!   |-------- challenge -------------->|
//!   |<------- response ----------------|
//!   |   (trusted key: authenticated)   |
//!   |-------- entry (sealed) --------->|
//!   |-------- entry (sealed) --------->|
//!   |<------- request -----------------|
//!   |-------- entry (sealed) --------->|
//!   |-------- announcement (sealed) -->|
//! ```

pub mod engine;
pub mod error;
pub mod messages;
pub mod reader;
pub mod session;
pub mod transport;

pub use engine::{EngineHandle, SessionSnapshot, SyncConfig, SyncEngine};
pub use error::{Result, SyncError};
pub use messages::{ChallengeNonce, WireMessage, CHALLENGE_LEN};
pub use reader::{Reader, ReaderConfig, ReaderHandle, ReaderView};
pub use session::{AuthError, AuthOutcome, AuthSession, SessionState};
pub use transport::{memory, PeerId, Transport, TransportEvent};
