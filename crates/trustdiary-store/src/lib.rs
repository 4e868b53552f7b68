//! # Trust Diary Store
//!
//! Storage abstraction for Trust Diary. Provides a trait-based interface
//! for identity, trust list and entry persistence with SQLite and in-memory
//! implementations, plus the [`EntryLog`] built on top of it.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`EntryLog`] - Append-only diary log with change notifications
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trustdiary_core::NewEntry;
//! use trustdiary_store::{EntryLog, SqliteStore, Store};
//!
//! async fn example() {
//!     let store: Arc<dyn Store> = Arc::new(SqliteStore::open("diary.db").unwrap());
//!     let log = EntryLog::open(store, None).await.unwrap();
//!     log.append(NewEntry::new("hello"), "Service").await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Insert-only identity**: a second identity save fails with `AlreadyExists`
//! - **Upsert trust records**: re-trusting a key overwrites the record in place
//! - **Idempotent entry inserts**: the same entry twice returns `AlreadyExists`

pub mod error;
pub mod log;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use log::EntryLog;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
