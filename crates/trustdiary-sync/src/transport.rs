//! Transport abstraction for the session protocol.
//!
//! A transport turns a rendezvous id into live peers: it reports peer
//! arrival and departure and carries ordered, reliable text frames to and
//! from each peer. Implementations may sit on WebRTC data channels, relays,
//! HTTP signaling or anything else; the protocol never sees which.

use std::fmt;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Serialize, Serializer};

use crate::error::Result;

/// Opaque, transport-assigned peer identifier.
///
/// Unrelated to any signing key until the peer authenticates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub [u8; 16]);

impl PeerId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a random peer ID.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..8])
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// What the transport reports to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peer joined the channel.
    Connected(PeerId),
    /// A peer left or was disconnected. No further frames arrive from it.
    Disconnected(PeerId),
    /// One frame from a peer, in the order the peer sent it.
    Message { from: PeerId, data: String },
}

/// Transport trait for exchanging frames with peers on one channel.
///
/// Implementations must be thread-safe (Send + Sync) and must deliver the
/// frames of one sender in order.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a frame to a specific peer.
    async fn send(&self, peer: &PeerId, frame: String) -> Result<()>;

    /// Wait for the next event. `None` means the transport is closed.
    async fn next_event(&self) -> Option<TransportEvent>;

    /// Drop the connection to a peer. Both sides observe `Disconnected`.
    async fn disconnect(&self, peer: &PeerId);

    /// Get the local peer identity.
    fn local_peer_id(&self) -> PeerId;
}

/// A simple in-memory transport for testing.
///
/// Every [`MemoryTransport`] joined to the same room sees every other one
/// as a connected peer.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::{mpsc, Mutex as AsyncMutex};
    use trustdiary_core::RendezvousId;

    use crate::error::SyncError;

    type Inbox = mpsc::UnboundedSender<TransportEvent>;

    #[derive(Default)]
    struct Rooms {
        members: HashMap<RendezvousId, HashMap<PeerId, Inbox>>,
        /// Unordered pairs whose link was cut with `disconnect`.
        severed: HashSet<(PeerId, PeerId)>,
    }

    fn pair(a: PeerId, b: PeerId) -> (PeerId, PeerId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        rooms: Mutex<Rooms>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Join a room. Existing members and the newcomer see each other connect.
        pub fn join(self: &Arc<Self>, room: &RendezvousId) -> MemoryTransport {
            let peer_id = PeerId::random();
            let (tx, rx) = mpsc::unbounded_channel();

            let mut rooms = self.rooms.lock();
            let members = rooms.members.entry(room.clone()).or_default();
            for (existing, inbox) in members.iter() {
                let _ = inbox.send(TransportEvent::Connected(peer_id));
                let _ = tx.send(TransportEvent::Connected(*existing));
            }
            members.insert(peer_id, tx);
            drop(rooms);

            tracing::debug!(%room, peer = %peer_id, "joined memory room");

            MemoryTransport {
                peer_id,
                room: room.clone(),
                network: Arc::clone(self),
                receiver: AsyncMutex::new(rx),
            }
        }

        /// Number of members currently in a room.
        pub fn room_size(&self, room: &RendezvousId) -> usize {
            self.rooms
                .lock()
                .members
                .get(room)
                .map_or(0, |members| members.len())
        }

        fn deliver(
            &self,
            room: &RendezvousId,
            from: PeerId,
            to: &PeerId,
            data: String,
        ) -> Result<()> {
            let rooms = self.rooms.lock();
            if rooms.severed.contains(&pair(from, *to)) {
                return Err(SyncError::Transport("peer disconnected".into()));
            }
            let inbox = rooms
                .members
                .get(room)
                .and_then(|members| members.get(to))
                .ok_or_else(|| SyncError::Transport("peer not found".into()))?;

            inbox
                .send(TransportEvent::Message { from, data })
                .map_err(|_| SyncError::Transport("peer disconnected".into()))
        }

        fn sever(&self, room: &RendezvousId, a: PeerId, b: PeerId) {
            let mut rooms = self.rooms.lock();
            if !rooms.severed.insert(pair(a, b)) {
                return;
            }
            if let Some(members) = rooms.members.get(room) {
                if let Some(inbox) = members.get(&a) {
                    let _ = inbox.send(TransportEvent::Disconnected(b));
                }
                if let Some(inbox) = members.get(&b) {
                    let _ = inbox.send(TransportEvent::Disconnected(a));
                }
            }
        }

        fn leave(&self, room: &RendezvousId, peer: PeerId) {
            let mut rooms = self.rooms.lock();
            let Rooms { members, severed } = &mut *rooms;

            if let Some(room_members) = members.get_mut(room) {
                room_members.remove(&peer);
                for (other, inbox) in room_members.iter() {
                    if !severed.contains(&pair(peer, *other)) {
                        let _ = inbox.send(TransportEvent::Disconnected(peer));
                    }
                }
                if room_members.is_empty() {
                    members.remove(room);
                }
            }
            severed.retain(|(a, b)| *a != peer && *b != peer);
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        peer_id: PeerId,
        room: RendezvousId,
        network: Arc<MemoryNetwork>,
        receiver: AsyncMutex<mpsc::UnboundedReceiver<TransportEvent>>,
    }

    impl MemoryTransport {
        pub fn room(&self) -> &RendezvousId {
            &self.room
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, peer: &PeerId, frame: String) -> Result<()> {
            self.network.deliver(&self.room, self.peer_id, peer, frame)
        }

        async fn next_event(&self) -> Option<TransportEvent> {
            self.receiver.lock().await.recv().await
        }

        async fn disconnect(&self, peer: &PeerId) {
            self.network.sever(&self.room, self.peer_id, *peer);
        }

        fn local_peer_id(&self) -> PeerId {
            self.peer_id
        }
    }

    impl Drop for MemoryTransport {
        fn drop(&mut self) {
            self.network.leave(&self.room, self.peer_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use trustdiary_core::{Keypair, RendezvousId};

    fn room() -> RendezvousId {
        RendezvousId::service("test", &Keypair::from_seed(&[1; 32]).public_key())
    }

    #[tokio::test]
    async fn test_members_see_each_other_connect() {
        let network = MemoryNetwork::new();
        let room = room();

        let a = network.join(&room);
        let b = network.join(&room);

        assert_eq!(
            a.next_event().await,
            Some(TransportEvent::Connected(b.local_peer_id()))
        );
        assert_eq!(
            b.next_event().await,
            Some(TransportEvent::Connected(a.local_peer_id()))
        );
        assert_eq!(network.room_size(&room), 2);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let network = MemoryNetwork::new();
        let room = room();
        let a = network.join(&room);
        let b = network.join(&room);
        b.next_event().await;

        for i in 0..5 {
            a.send(&b.local_peer_id(), format!("frame {i}")).await.unwrap();
        }
        for i in 0..5 {
            assert_eq!(
                b.next_event().await,
                Some(TransportEvent::Message {
                    from: a.local_peer_id(),
                    data: format!("frame {i}"),
                })
            );
        }
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let network = MemoryNetwork::new();
        let a = network.join(&room());
        let other_room = RendezvousId::service("other", &Keypair::from_seed(&[1; 32]).public_key());
        let b = network.join(&other_room);

        assert!(a.send(&b.local_peer_id(), "hi".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_notifies_both_sides_and_blocks_sends() {
        let network = MemoryNetwork::new();
        let room = room();
        let a = network.join(&room);
        let b = network.join(&room);
        a.next_event().await;
        b.next_event().await;

        a.disconnect(&b.local_peer_id()).await;

        assert_eq!(
            a.next_event().await,
            Some(TransportEvent::Disconnected(b.local_peer_id()))
        );
        assert_eq!(
            b.next_event().await,
            Some(TransportEvent::Disconnected(a.local_peer_id()))
        );
        assert!(b.send(&a.local_peer_id(), "late".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_drop_leaves_room() {
        let network = MemoryNetwork::new();
        let room = room();
        let a = network.join(&room);
        let b = network.join(&room);
        a.next_event().await;

        let b_id = b.local_peer_id();
        drop(b);

        assert_eq!(a.next_event().await, Some(TransportEvent::Disconnected(b_id)));
        assert_eq!(network.room_size(&room), 1);
    }
}
