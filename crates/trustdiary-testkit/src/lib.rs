//! # Trust Diary Testkit
//!
//! Testing utilities for Trust Diary.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Known-answer vectors**: Fixed key derivations, challenge signatures
//!   and entry signatures other implementations must reproduce
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A holder serving on an in-memory network, readers and
//!   raw wire-level peers
//! - **Wait helpers**: Deadlines for conditions observed across tasks
//!
//! ## Known-Answer Vectors
//!
//! ```rust
//! use trustdiary_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, actual) in verify_all_vectors() {
//!     assert!(matches, "{name}: {actual}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use trustdiary_testkit::generators::{distinct_identities, salt};
//! use trustdiary_core::RendezvousId;
//!
//! proptest! {
//!     #[test]
//!     fn pairwise_is_symmetric((a, b) in distinct_identities()) {
//!         prop_assert_eq!(
//!             RendezvousId::pairwise(&a.sign_public_key(), &b.sign_public_key()),
//!             RendezvousId::pairwise(&b.sign_public_key(), &a.sign_public_key()),
//!         );
//!     }
//! }
//! ```
//!
//! ## Scenario Fixtures
//!
//! ```rust,no_run
//! use trustdiary::DiaryConfig;
//! use trustdiary_core::PermissionSet;
//! use trustdiary_sync::ReaderConfig;
//! use trustdiary_testkit::{wait_for_entries, HolderFixture, Party};
//!
//! async fn example() {
//!     let holder = HolderFixture::start(DiaryConfig::default()).await;
//!     let reader = Party::new();
//!     holder.trust(&reader, "Bea", PermissionSet::read_only()).await;
//!     holder.append("hello").await;
//!
//!     let joined = holder.join_reader(&reader, ReaderConfig::default());
//!     wait_for_entries(&joined.handle, 1).await;
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;
pub mod wait;

pub use fixtures::{multi_party, HolderFixture, Party, RawPeer, ReaderFixture};
pub use vectors::{challenge_vectors, entry_vectors, key_vectors, verify_all_vectors};
pub use wait::{wait_for_entries, wait_for_view, wait_until, DEFAULT_TIMEOUT};

/// Install a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
}
