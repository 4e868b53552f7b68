//! The trust store: which signing keys may receive protected content.
//!
//! Lookups happen on every inbound response and every broadcast, so they are
//! served from an in-memory index behind a reader/writer lock. Writes are
//! administrative, serialized, and persisted before the index changes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

use trustdiary_core::{Ed25519PublicKey, PermissionSet, RosterEntry, TrustRecord, X25519PublicKey};
use trustdiary_store::Store;

use crate::error::Result;

#[derive(Default)]
struct Index {
    records: HashMap<Ed25519PublicKey, TrustRecord>,
    /// Keys in insertion order.
    order: Vec<Ed25519PublicKey>,
}

/// Trust list with write-through persistence.
pub struct TrustStore {
    store: Arc<dyn Store>,
    index: RwLock<Index>,
    write_lock: Mutex<()>,
}

impl TrustStore {
    /// Load the trust list from the store.
    pub async fn open(store: Arc<dyn Store>) -> Result<Self> {
        let mut index = Index::default();
        for record in store.list_trust_records().await? {
            index.order.push(record.sign_public_key);
            index.records.insert(record.sign_public_key, record);
        }

        Ok(Self {
            store,
            index: RwLock::new(index),
            write_lock: Mutex::new(()),
        })
    }

    /// Trust a signing key, or overwrite the existing record for it.
    ///
    /// Re-adding a key replaces its encryption key, name and permissions.
    /// An empty permission set grants read.
    pub async fn add(
        &self,
        sign_public_key: Ed25519PublicKey,
        enc_public_key: X25519PublicKey,
        display_name: impl Into<String>,
        permissions: PermissionSet,
    ) -> Result<TrustRecord> {
        let record = TrustRecord::new(sign_public_key, enc_public_key, display_name, permissions);

        let _guard = self.write_lock.lock().await;
        self.store.upsert_trust_record(&record).await?;

        let mut index = self.index.write();
        if index.records.insert(sign_public_key, record.clone()).is_none() {
            index.order.push(sign_public_key);
        }
        drop(index);

        info!(key = %sign_public_key, name = %record.display_name, "peer trusted");
        Ok(record)
    }

    /// Stop trusting a key. Returns whether it was trusted.
    ///
    /// Sessions that are already authenticated are not affected.
    pub async fn remove(&self, sign_public_key: &Ed25519PublicKey) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let removed = self.store.remove_trust_record(sign_public_key).await?;

        let mut index = self.index.write();
        index.records.remove(sign_public_key);
        index.order.retain(|k| k != sign_public_key);
        drop(index);

        if removed {
            info!(key = %sign_public_key, "peer removed from trust list");
        }
        Ok(removed)
    }

    pub fn lookup(&self, sign_public_key: &Ed25519PublicKey) -> Option<TrustRecord> {
        self.index.read().records.get(sign_public_key).cloned()
    }

    pub fn is_trusted(&self, sign_public_key: &Ed25519PublicKey) -> bool {
        self.index.read().records.contains_key(sign_public_key)
    }

    /// All records in insertion order.
    pub fn list(&self) -> Vec<TrustRecord> {
        let index = self.index.read();
        index
            .order
            .iter()
            .filter_map(|k| index.records.get(k).cloned())
            .collect()
    }

    /// The publishable trust list: names, signing keys and permissions.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.list().iter().map(TrustRecord::roster_entry).collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
