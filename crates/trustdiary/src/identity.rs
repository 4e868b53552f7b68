//! Loading and first-run creation of the process identity.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use trustdiary_core::{Identity, PublicIdentity};
use trustdiary_store::{Store, StoreError};

use crate::error::Result;

/// Owns the one [`Identity`] of this process.
///
/// The identity is created and saved on first use and loaded on every run
/// after that. Persisted material that fails to load is an error; it is
/// never replaced with a fresh identity, since every trust record a peer
/// holds refers to the old keys.
pub struct IdentityManager {
    store: Arc<dyn Store>,
    identity: OnceCell<Arc<Identity>>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            identity: OnceCell::new(),
        }
    }

    /// Load the persisted identity, creating and saving one if none exists.
    ///
    /// Repeated calls return the same identity.
    pub async fn load_or_create(&self) -> Result<Arc<Identity>> {
        self.identity
            .get_or_try_init(|| self.load_or_create_uncached())
            .await
            .cloned()
    }

    /// The public keys to hand to peers.
    pub async fn export_public(&self) -> Result<PublicIdentity> {
        Ok(self.load_or_create().await?.public())
    }

    async fn load_or_create_uncached(&self) -> Result<Arc<Identity>> {
        if let Some(identity) = self.load().await? {
            info!(identity = %identity.sign_public_key(), "identity loaded");
            return Ok(Arc::new(identity));
        }

        let identity = Identity::generate();
        match self.store.save_identity(&identity.to_record()).await {
            Ok(()) => {
                info!(identity = %identity.sign_public_key(), "identity created");
                Ok(Arc::new(identity))
            }
            // Someone else created it between our load and save.
            Err(StoreError::AlreadyExists(_)) => {
                let identity = self.load().await?.ok_or_else(|| {
                    StoreError::InvalidData("identity disappeared after save conflict".into())
                })?;
                Ok(Arc::new(identity))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self) -> Result<Option<Identity>> {
        let Some(record) = self.store.load_identity().await? else {
            return Ok(None);
        };
        let identity = Identity::from_record(&record)
            .map_err(|e| StoreError::InvalidData(format!("identity record: {e}")))?;
        Ok(Some(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiaryError;
    use trustdiary_store::{MemoryStore, SqliteStore};

    #[tokio::test]
    async fn test_creates_once_and_caches() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let manager = IdentityManager::new(Arc::clone(&store));

        let first = manager.load_or_create().await.unwrap();
        let second = manager.load_or_create().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let saved = store.load_identity().await.unwrap().unwrap();
        assert_eq!(saved.sign_public_key, first.sign_public_key());
    }

    #[tokio::test]
    async fn test_identity_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diary.db");

        let created = {
            let store = Arc::new(SqliteStore::open(&path).unwrap());
            IdentityManager::new(store).export_public().await.unwrap()
        };

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let loaded = IdentityManager::new(store).export_public().await.unwrap();
        assert_eq!(created, loaded);
    }

    #[tokio::test]
    async fn test_corrupt_identity_is_not_replaced() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut record = Identity::generate().to_record();
        record.enc_public_key = Identity::generate().enc_public_key();
        store.save_identity(&record).await.unwrap();

        let manager = IdentityManager::new(Arc::clone(&store));
        let err = manager.load_or_create().await.unwrap_err();
        assert!(matches!(err, DiaryError::Store(StoreError::InvalidData(_))));

        // The stored material is untouched.
        assert_eq!(store.load_identity().await.unwrap(), Some(record));
    }
}
