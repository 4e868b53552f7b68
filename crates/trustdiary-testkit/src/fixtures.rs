//! Test fixtures and helpers.
//!
//! Common setup code for scenario tests: parties with deterministic keys, a
//! holder serving a diary on an in-memory network, readers, and raw peers
//! that speak the wire protocol by hand.

use std::sync::Arc;
use std::time::Duration;

use trustdiary::{Diary, DiaryConfig};
use trustdiary_core::{
    DiaryEntry, Ed25519PublicKey, Identity, NewEntry, PermissionSet, PublicIdentity, TrustRecord,
};
use trustdiary_store::MemoryStore;
use trustdiary_sync::memory::{MemoryNetwork, MemoryTransport};
use trustdiary_sync::{
    EngineHandle, PeerId, Reader, ReaderConfig, ReaderHandle, SessionSnapshot, SessionState,
    Transport, TransportEvent, WireMessage,
};

use crate::wait::{wait_until, DEFAULT_TIMEOUT};

/// One participant with a full identity.
pub struct Party {
    pub identity: Arc<Identity>,
}

impl Party {
    /// Create a party with random keys.
    pub fn new() -> Self {
        Self {
            identity: Arc::new(Identity::generate()),
        }
    }

    /// Create with deterministic keys derived from `seed`.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            identity: Arc::new(Identity::from_seeds([seed; 32], [seed ^ 0xff; 32])),
        }
    }

    pub fn public(&self) -> PublicIdentity {
        self.identity.public()
    }

    pub fn sign_public_key(&self) -> Ed25519PublicKey {
        self.identity.sign_public_key()
    }
}

impl Default for Party {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple parties with distinct deterministic keys.
pub fn multi_party(count: usize) -> Vec<Party> {
    (0..count).map(|i| Party::with_seed(i as u8 + 1)).collect()
}

/// A diary served on a fresh in-memory network.
pub struct HolderFixture {
    pub diary: Diary,
    pub network: Arc<MemoryNetwork>,
    pub engine: EngineHandle,
    pub peer: PeerId,
}

impl HolderFixture {
    /// Open a diary on a memory store and start serving it.
    pub async fn start(config: DiaryConfig) -> Self {
        let diary = Diary::open(Arc::new(MemoryStore::new()), config)
            .await
            .expect("open diary");
        let network = MemoryNetwork::new();
        let transport = Arc::new(network.join(diary.room_id()));
        let peer = transport.local_peer_id();
        let engine = diary.serve(transport);

        Self {
            diary,
            network,
            engine,
            peer,
        }
    }

    pub async fn trust(
        &self,
        party: &Party,
        name: &str,
        permissions: PermissionSet,
    ) -> TrustRecord {
        self.diary
            .trust_reader(party.public(), name, permissions)
            .await
            .expect("trust reader")
    }

    pub async fn append(&self, content: &str) -> DiaryEntry {
        self.diary
            .append(NewEntry::new(content))
            .await
            .expect("append entry")
    }

    /// Start a reader for `party` in the holder's room.
    pub fn join_reader(&self, party: &Party, config: ReaderConfig) -> ReaderFixture {
        let transport = Arc::new(self.network.join(self.diary.room_id()));
        let peer = transport.local_peer_id();
        let handle = Reader::new(transport, Arc::clone(&party.identity), config).spawn();
        ReaderFixture { peer, handle }
    }

    /// Join the holder's room without a reader behind the connection.
    pub fn join_raw(&self) -> RawPeer {
        RawPeer {
            transport: self.network.join(self.diary.room_id()),
        }
    }

    /// The engine's view of one peer.
    pub async fn session(&self, peer: PeerId) -> Option<SessionSnapshot> {
        self.engine
            .sessions()
            .await
            .expect("engine running")
            .into_iter()
            .find(|snapshot| snapshot.peer == peer)
    }

    /// Wait until the engine reports `peer` in `state`.
    pub async fn wait_for_state(&self, peer: PeerId, state: SessionState) {
        wait_until(&format!("peer {peer} to reach {state:?}"), || async move {
            self.session(peer).await.is_some_and(|s| s.state == state)
        })
        .await;
    }

    /// Wait until the engine no longer tracks `peer`.
    pub async fn wait_for_gone(&self, peer: PeerId) {
        wait_until(&format!("peer {peer} to be dropped"), || async move {
            self.session(peer).await.is_none()
        })
        .await;
    }

    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }
}

/// A running reader and the transport peer id it joined as.
pub struct ReaderFixture {
    pub peer: PeerId,
    pub handle: ReaderHandle,
}

/// A peer that reads and writes wire messages directly.
pub struct RawPeer {
    pub transport: MemoryTransport,
}

impl RawPeer {
    pub fn peer(&self) -> PeerId {
        self.transport.local_peer_id()
    }

    /// The next transport event, or `None` if nothing arrives within `wait`.
    pub async fn next_event_within(&self, wait: Duration) -> Option<TransportEvent> {
        tokio::time::timeout(wait, self.transport.next_event())
            .await
            .ok()
            .flatten()
    }

    /// The next wire message, skipping connect events.
    pub async fn next_message(&self) -> (PeerId, WireMessage) {
        loop {
            let event = self
                .next_event_within(DEFAULT_TIMEOUT)
                .await
                .expect("no message before timeout");
            if let TransportEvent::Message { from, data } = event {
                return (from, WireMessage::parse(&data).expect("well-formed frame"));
            }
        }
    }

    /// Wait for a challenge and return it with the holder's peer id.
    pub async fn next_challenge(&self) -> (PeerId, trustdiary_sync::ChallengeNonce) {
        match self.next_message().await {
            (from, WireMessage::Challenge { challenge, .. }) => (from, challenge),
            (_, other) => panic!("expected challenge, got {}", other.kind()),
        }
    }

    pub async fn send(&self, to: PeerId, message: &WireMessage) {
        self.transport
            .send(&to, message.to_frame().expect("encode frame"))
            .await
            .expect("send frame");
    }

    /// Answer `challenge` as `identity`.
    pub async fn respond(&self, to: PeerId, identity: &Identity, signed: &[u8]) {
        let response = WireMessage::Response {
            signature: identity.sign(signed),
            public_key: identity.sign_public_key(),
        };
        self.send(to, &response).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_party() {
        let parties = multi_party(3);

        // Each party has unique keys
        let keys: Vec<_> = parties.iter().map(|p| p.sign_public_key()).collect();
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert_ne!(keys[0], keys[2]);
    }

    #[test]
    fn test_seeded_party_is_deterministic() {
        assert_eq!(Party::with_seed(7).public(), Party::with_seed(7).public());
    }

    #[tokio::test]
    async fn test_raw_peer_is_challenged() {
        let holder = HolderFixture::start(DiaryConfig::default()).await;
        let raw = holder.join_raw();

        let (from, _) = raw.next_challenge().await;
        assert_eq!(from, holder.peer);
        holder.wait_for_state(raw.peer(), SessionState::Challenged).await;

        holder.shutdown().await;
    }
}
