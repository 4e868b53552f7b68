//! Store trait: the abstract interface for Trust Diary persistence.
//!
//! Three record sets live behind it: the single local identity, the trust
//! list and the entry log. Implementations include SQLite (primary) and
//! in-memory (for tests).

use async_trait::async_trait;
use trustdiary_core::{DiaryEntry, Ed25519PublicKey, EntryId, IdentityRecord, TrustRecord};

use crate::error::Result;

/// Result of appending an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Entry was inserted.
    Inserted,
    /// The identical entry already exists (idempotent, not an error).
    AlreadyExists,
    /// A different entry already occupies this id.
    Conflict {
        /// The id that is taken.
        existing: EntryId,
    },
}

/// The Store trait: async interface for identity, trust and entry persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Identity
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the persisted identity, if one was ever saved.
    ///
    /// Returns `InvalidData` if the stored material is truncated or the
    /// wrong size. Never returns a partially filled record.
    async fn load_identity(&self) -> Result<Option<IdentityRecord>>;

    /// Persist the identity.
    ///
    /// Insert-only: fails with `AlreadyExists` if an identity is stored.
    async fn save_identity(&self, record: &IdentityRecord) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Trust list
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or overwrite the record for `record.sign_public_key`.
    ///
    /// An overwritten record keeps its position in [`Store::list_trust_records`].
    async fn upsert_trust_record(&self, record: &TrustRecord) -> Result<()>;

    /// Remove a record. Returns whether one existed.
    async fn remove_trust_record(&self, key: &Ed25519PublicKey) -> Result<bool>;

    /// All records, in insertion order.
    async fn list_trust_records(&self) -> Result<Vec<TrustRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Entry log
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an entry at `entry.id`.
    async fn append_entry(&self, entry: &DiaryEntry) -> Result<InsertResult>;

    /// All entries, ordered by id.
    async fn list_entries(&self) -> Result<Vec<DiaryEntry>>;

    /// Get one entry by id.
    async fn get_entry(&self, id: EntryId) -> Result<Option<DiaryEntry>>;
}
