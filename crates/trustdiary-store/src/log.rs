//! The entry log: an append-only, single-writer sequence of diary entries.
//!
//! Reads are served from an in-memory copy so that broadcasting to many
//! peers never touches the database. Appends are serialized, persisted
//! first, and only then become visible to readers and subscribers.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use trustdiary_core::{now_millis, DiaryEntry, EntryId, Keypair, NewEntry};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// Capacity of the append notification channel.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Append-only log owned by one author.
pub struct EntryLog {
    store: Arc<dyn Store>,
    /// Signs new entries when set.
    signer: Option<Keypair>,
    entries: RwLock<Vec<DiaryEntry>>,
    append_lock: Mutex<()>,
    appended: broadcast::Sender<DiaryEntry>,
}

impl EntryLog {
    /// Load the log from the store.
    pub async fn open(store: Arc<dyn Store>, signer: Option<Keypair>) -> Result<Self> {
        let entries = store.list_entries().await?;
        debug!(count = entries.len(), "entry log loaded");

        let (appended, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Ok(Self {
            store,
            signer,
            entries: RwLock::new(entries),
            append_lock: Mutex::new(()),
            appended,
        })
    }

    /// Append a new entry.
    ///
    /// Assigns the next id, stamps the creation time and signs the entry if
    /// the log has a signer. The entry is persisted before it is published.
    pub async fn append(&self, new: NewEntry, author: &str) -> Result<DiaryEntry> {
        let _guard = self.append_lock.lock().await;

        let id = self.next_id();
        let mut entry = new.into_entry(id, author, now_millis());
        if let Some(signer) = &self.signer {
            entry = entry.sign(signer)?;
        }

        match self.store.append_entry(&entry).await? {
            InsertResult::Inserted => {}
            InsertResult::AlreadyExists | InsertResult::Conflict { .. } => {
                return Err(StoreError::AlreadyExists(format!("entry {id}")));
            }
        }

        self.entries.write().push(entry.clone());
        info!(id, author, "entry appended");

        // No receivers is fine.
        let _ = self.appended.send(entry.clone());
        Ok(entry)
    }

    /// All entries in creation order.
    pub fn all(&self) -> Vec<DiaryEntry> {
        self.entries.read().clone()
    }

    pub fn get(&self, id: EntryId) -> Option<DiaryEntry> {
        let entries = self.entries.read();
        entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| entries[index].clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Receive every entry appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DiaryEntry> {
        self.appended.subscribe()
    }

    fn next_id(&self) -> EntryId {
        self.entries.read().last().map_or(1, |e| e.id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, SqliteStore};

    #[tokio::test]
    async fn test_ids_are_monotonic_from_one() {
        let log = EntryLog::open(Arc::new(MemoryStore::new()), None).await.unwrap();

        let e1 = log.append(NewEntry::new("a"), "me").await.unwrap();
        let e2 = log.append(NewEntry::new("b"), "me").await.unwrap();

        assert_eq!((e1.id, e2.id), (1, 2));
        assert!(!e1.is_signed());
        assert_eq!(log.all(), vec![e1, e2.clone()]);
        assert_eq!(log.get(2), Some(e2));
        assert_eq!(log.get(9), None);
    }

    #[tokio::test]
    async fn test_signer_signs_entries() {
        let keypair = Keypair::generate();
        let log = EntryLog::open(Arc::new(MemoryStore::new()), Some(keypair.clone()))
            .await
            .unwrap();

        let entry = log.append(NewEntry::new("signed").title("t"), "me").await.unwrap();
        entry.verify(&keypair.public_key()).unwrap();
    }

    #[tokio::test]
    async fn test_subscribers_see_appends() {
        let log = EntryLog::open(Arc::new(MemoryStore::new()), None).await.unwrap();
        let mut rx = log.subscribe();

        let entry = log.append(NewEntry::new("news"), "me").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), entry);
    }

    #[tokio::test]
    async fn test_reopen_continues_numbering() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open_memory().unwrap());

        let log = EntryLog::open(store.clone(), None).await.unwrap();
        log.append(NewEntry::new("one"), "me").await.unwrap();
        log.append(NewEntry::new("two"), "me").await.unwrap();
        drop(log);

        let log = EntryLog::open(store, None).await.unwrap();
        assert_eq!(log.len(), 2);
        let third = log.append(NewEntry::new("three"), "me").await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_distinct_ids() {
        let log = Arc::new(EntryLog::open(Arc::new(MemoryStore::new()), None).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(NewEntry::new(format!("entry {i}")), "me").await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let ids: Vec<_> = log.all().iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    }
}
