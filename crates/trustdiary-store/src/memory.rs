//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use trustdiary_core::{DiaryEntry, Ed25519PublicKey, EntryId, IdentityRecord, TrustRecord};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    identity: Option<IdentityRecord>,

    /// Trust records in insertion order.
    trusted: Vec<TrustRecord>,

    entries: BTreeMap<EntryId, DiaryEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_identity(&self) -> Result<Option<IdentityRecord>> {
        Ok(self.inner.read().identity.clone())
    }

    async fn save_identity(&self, record: &IdentityRecord) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.identity.is_some() {
            return Err(StoreError::AlreadyExists("identity".into()));
        }
        inner.identity = Some(record.clone());
        Ok(())
    }

    async fn upsert_trust_record(&self, record: &TrustRecord) -> Result<()> {
        let mut inner = self.inner.write();
        match inner
            .trusted
            .iter_mut()
            .find(|r| r.sign_public_key == record.sign_public_key)
        {
            Some(existing) => *existing = record.clone(),
            None => inner.trusted.push(record.clone()),
        }
        Ok(())
    }

    async fn remove_trust_record(&self, key: &Ed25519PublicKey) -> Result<bool> {
        let mut inner = self.inner.write();
        let before = inner.trusted.len();
        inner.trusted.retain(|r| &r.sign_public_key != key);
        Ok(inner.trusted.len() != before)
    }

    async fn list_trust_records(&self) -> Result<Vec<TrustRecord>> {
        Ok(self.inner.read().trusted.clone())
    }

    async fn append_entry(&self, entry: &DiaryEntry) -> Result<InsertResult> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.entries.get(&entry.id) {
            return Ok(if existing == entry {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Conflict { existing: entry.id }
            });
        }
        inner.entries.insert(entry.id, entry.clone());
        Ok(InsertResult::Inserted)
    }

    async fn list_entries(&self) -> Result<Vec<DiaryEntry>> {
        Ok(self.inner.read().entries.values().cloned().collect())
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<DiaryEntry>> {
        Ok(self.inner.read().entries.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustdiary_core::{Identity, NewEntry, PermissionSet};

    fn record(seed: u8, name: &str) -> TrustRecord {
        let identity = Identity::from_seeds([seed; 32], [seed.wrapping_add(1); 32]);
        TrustRecord::new(
            identity.sign_public_key(),
            identity.enc_public_key(),
            name,
            PermissionSet::read_only(),
        )
    }

    #[tokio::test]
    async fn test_identity_is_insert_only() {
        let store = MemoryStore::new();
        let identity = Identity::generate();

        store.save_identity(&identity.to_record()).await.unwrap();
        let err = store
            .save_identity(&Identity::generate().to_record())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let loaded = store.load_identity().await.unwrap().unwrap();
        assert_eq!(loaded.sign_public_key, identity.sign_public_key());
    }

    #[tokio::test]
    async fn test_upsert_keeps_position() {
        let store = MemoryStore::new();
        store.upsert_trust_record(&record(1, "a")).await.unwrap();
        store.upsert_trust_record(&record(2, "b")).await.unwrap();
        store.upsert_trust_record(&record(1, "a2")).await.unwrap();

        let names: Vec<_> = store
            .list_trust_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["a2", "b"]);
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let store = MemoryStore::new();
        let r = record(3, "c");
        store.upsert_trust_record(&r).await.unwrap();

        assert!(store.remove_trust_record(&r.sign_public_key).await.unwrap());
        assert!(!store.remove_trust_record(&r.sign_public_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_conflict_detection() {
        let store = MemoryStore::new();
        let e1 = NewEntry::new("one").into_entry(1, "a", 10);
        let other = NewEntry::new("other").into_entry(1, "a", 11);

        assert_eq!(store.append_entry(&e1).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.append_entry(&e1).await.unwrap(), InsertResult::AlreadyExists);
        assert_eq!(
            store.append_entry(&other).await.unwrap(),
            InsertResult::Conflict { existing: 1 }
        );
        assert_eq!(store.get_entry(1).await.unwrap(), Some(e1));
    }
}
