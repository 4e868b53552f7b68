//! The Diary: a holder's identity, trust list and entry log behind one API.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use trustdiary_core::{
    DiaryEntry, Ed25519PublicKey, EntryId, Identity, NewEntry, PermissionSet, PublicIdentity,
    RendezvousId, TrustRecord,
};
use trustdiary_store::{EntryLog, Store};
use trustdiary_sync::{EngineHandle, SessionSnapshot, SyncEngine, Transport};
use trustdiary_trust::TrustStore;

use crate::config::DiaryConfig;
use crate::error::Result;
use crate::identity::IdentityManager;

/// Point-in-time status of a diary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryStatus {
    pub room_id: RendezvousId,
    pub identity: PublicIdentity,
    pub trusted: usize,
    pub entries: usize,
    pub sessions: Vec<SessionSnapshot>,
}

/// A diary held by one identity and shared with the readers it trusts.
///
/// Provides a unified API for:
/// - Loading or creating the holder identity
/// - Managing the trust list
/// - Appending entries
/// - Serving entries to readers over a transport
pub struct Diary {
    identity: Arc<Identity>,
    trust: Arc<TrustStore>,
    log: Arc<EntryLog>,
    room: RendezvousId,
    config: DiaryConfig,
}

impl Diary {
    /// Open a diary on `store`, creating the identity on first run.
    pub async fn open(store: Arc<dyn Store>, config: DiaryConfig) -> Result<Self> {
        let identity = IdentityManager::new(Arc::clone(&store))
            .load_or_create()
            .await?;
        let trust = Arc::new(TrustStore::open(Arc::clone(&store)).await?);
        let signer = config.sign_entries.then(|| identity.keypair().clone());
        let log = Arc::new(EntryLog::open(store, signer).await?);

        if log.is_empty() {
            if let Some(initial) = config.initial_entry.clone() {
                log.append(initial, &config.author_name).await?;
            }
        }

        let room = RendezvousId::service(&config.room_salt, &identity.sign_public_key());
        info!(
            holder = %identity.sign_public_key(),
            %room,
            trusted = trust.len(),
            entries = log.len(),
            "diary opened"
        );

        Ok(Self {
            identity,
            trust,
            log,
            room,
            config,
        })
    }

    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    /// The public keys readers need to trust and reach this diary.
    pub fn public_identity(&self) -> PublicIdentity {
        self.identity.public()
    }

    /// The rendezvous id readers join to reach this diary.
    pub fn room_id(&self) -> &RendezvousId {
        &self.room
    }

    pub fn trust(&self) -> &Arc<TrustStore> {
        &self.trust
    }

    pub fn log(&self) -> &Arc<EntryLog> {
        &self.log
    }

    pub fn config(&self) -> &DiaryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Trust
    // ─────────────────────────────────────────────────────────────────────────

    /// Trust a reader. Re-trusting replaces its encryption key and permissions.
    ///
    /// Sessions that are already authenticated keep the record they
    /// authenticated with.
    pub async fn trust_reader(
        &self,
        reader: PublicIdentity,
        display_name: impl Into<String>,
        permissions: PermissionSet,
    ) -> Result<TrustRecord> {
        Ok(self
            .trust
            .add(
                reader.sign_public_key,
                reader.enc_public_key,
                display_name,
                permissions,
            )
            .await?)
    }

    /// Stop trusting a reader. Returns whether it was trusted.
    pub async fn untrust_reader(&self, sign_public_key: &Ed25519PublicKey) -> Result<bool> {
        Ok(self.trust.remove(sign_public_key).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entries
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an entry. Running engines broadcast it to authenticated readers.
    pub async fn append(&self, entry: NewEntry) -> Result<DiaryEntry> {
        Ok(self.log.append(entry, &self.config.author_name).await?)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<DiaryEntry> {
        self.log.all()
    }

    pub fn entry(&self, id: EntryId) -> Option<DiaryEntry> {
        self.log.get(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serving
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a sync engine on `transport`.
    ///
    /// The transport should already be joined to [`room_id`](Self::room_id).
    pub fn serve<T: Transport + 'static>(&self, transport: Arc<T>) -> EngineHandle {
        SyncEngine::new(
            transport,
            Arc::clone(&self.identity),
            Arc::clone(&self.trust),
            Arc::clone(&self.log),
            self.config.sync.clone(),
        )
        .spawn()
    }

    /// Report the diary's state, including live sessions when an engine is given.
    pub async fn status(&self, engine: Option<&EngineHandle>) -> Result<DiaryStatus> {
        let sessions = match engine {
            Some(engine) => engine.sessions().await?,
            None => Vec::new(),
        };

        Ok(DiaryStatus {
            room_id: self.room.clone(),
            identity: self.public_identity(),
            trusted: self.trust.len(),
            entries: self.log.len(),
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustdiary_core::{Permission, DEFAULT_ROOM_SALT};
    use trustdiary_store::MemoryStore;

    async fn open(config: DiaryConfig) -> (Arc<dyn Store>, Diary) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let diary = Diary::open(Arc::clone(&store), config).await.unwrap();
        (store, diary)
    }

    #[tokio::test]
    async fn test_room_id_matches_reader_derivation() {
        let (_, diary) = open(DiaryConfig::default()).await;
        let holder_key = diary.public_identity().sign_public_key;
        let expected = RendezvousId::service(DEFAULT_ROOM_SALT, &holder_key);
        assert_eq!(diary.room_id(), &expected);

        let (_, salted) = open(DiaryConfig::default().with_room_salt("other")).await;
        assert_ne!(
            salted.room_id(),
            &RendezvousId::service(DEFAULT_ROOM_SALT, &salted.public_identity().sign_public_key)
        );
    }

    #[tokio::test]
    async fn test_appended_entries_are_signed_by_holder() {
        let (_, diary) = open(DiaryConfig::default()).await;
        let entry = diary
            .append(NewEntry::new("first").title("Day one").mood("calm"))
            .await
            .unwrap();

        assert_eq!(entry.author, "Service");
        entry.verify(&diary.public_identity().sign_public_key).unwrap();
        assert_eq!(diary.entries(), vec![entry.clone()]);
        assert_eq!(diary.entry(entry.id), Some(entry));
    }

    #[tokio::test]
    async fn test_unsigned_entries_when_disabled() {
        let config = DiaryConfig::default()
            .with_sign_entries(false)
            .with_author_name("Ana");
        let (_, diary) = open(config).await;
        let entry = diary.append(NewEntry::new("plain")).await.unwrap();
        assert!(!entry.is_signed());
        assert_eq!(entry.author, "Ana");
    }

    #[tokio::test]
    async fn test_initial_entry_written_once() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = DiaryConfig::default()
            .with_initial_entry(NewEntry::new("Trust Diary Service started"));

        let diary = Diary::open(Arc::clone(&store), config.clone()).await.unwrap();
        assert_eq!(diary.entries().len(), 1);
        drop(diary);

        let reopened = Diary::open(store, config).await.unwrap();
        assert_eq!(reopened.entries().len(), 1);
        assert_eq!(reopened.entries()[0].content, "Trust Diary Service started");
    }

    #[tokio::test]
    async fn test_trust_and_untrust_reader() {
        let (_, diary) = open(DiaryConfig::default()).await;
        let reader = Identity::generate().public();

        let record = diary
            .trust_reader(reader, "Bea", PermissionSet::new())
            .await
            .unwrap();
        assert!(record.permissions.contains(Permission::Read));

        let status = diary.status(None).await.unwrap();
        assert_eq!(status.trusted, 1);
        assert!(status.sessions.is_empty());

        assert!(diary.untrust_reader(&reader.sign_public_key).await.unwrap());
        assert!(!diary.untrust_reader(&reader.sign_public_key).await.unwrap());
        assert_eq!(diary.status(None).await.unwrap().trusted, 0);
    }

    #[tokio::test]
    async fn test_status_serializes_camel_case() {
        let (_, diary) = open(DiaryConfig::default()).await;
        diary.append(NewEntry::new("x")).await.unwrap();

        let json = serde_json::to_value(diary.status(None).await.unwrap()).unwrap();
        assert_eq!(json["roomId"], diary.room_id().as_str());
        assert_eq!(json["entries"], 1);
        assert!(json["identity"]["signPublicKey"].is_string());
    }
}
