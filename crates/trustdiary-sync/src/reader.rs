//! Reader side of the protocol.
//!
//! A reader answers challenges with its signing key, then collects the
//! entries and announcements the holder seals for it. It never writes back.
//!
//! The view belongs to one holder at a time. While a holder is connected,
//! challenges signed by any other holder key go unanswered. When a
//! different holder is accepted later, the previous holder's entries and
//! announcements are cleared.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use trustdiary_core::{DiaryEntry, Ed25519PublicKey, EntryId, Identity, PublicIdentity};
use trustdiary_trust::Sealed;

use crate::error::{Result, SyncError};
use crate::messages::{ChallengeNonce, WireMessage};
use crate::transport::{PeerId, Transport, TransportEvent};

/// Configuration for a reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Only answer challenges from this holder signing key.
    pub expected_holder: Option<Ed25519PublicKey>,
    /// Send `request` right after answering a challenge.
    pub request_on_challenge: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            expected_holder: None,
            request_on_challenge: true,
        }
    }
}

impl ReaderConfig {
    pub fn with_expected_holder(mut self, holder: Ed25519PublicKey) -> Self {
        self.expected_holder = Some(holder);
        self
    }

    pub fn with_request_on_challenge(mut self, request: bool) -> Self {
        self.request_on_challenge = request;
        self
    }
}

/// What a reader has learned so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderView {
    /// The holder the entries came from, while it is connected.
    pub holder: Option<PublicIdentity>,
    /// Received entries, ordered by id, one copy each.
    pub entries: Vec<DiaryEntry>,
    /// Decrypted announcement payloads in arrival order.
    pub announcements: Vec<serde_json::Value>,
    /// Inbound frames that were dropped (malformed, undecryptable, bad signature).
    pub dropped: u64,
}

#[derive(Default)]
struct ReaderState {
    holder: Option<PublicIdentity>,
    entries: BTreeMap<EntryId, DiaryEntry>,
    announcements: Vec<serde_json::Value>,
    dropped: u64,
}

impl ReaderState {
    fn view(&self) -> ReaderView {
        ReaderView {
            holder: self.holder,
            entries: self.entries.values().cloned().collect(),
            announcements: self.announcements.clone(),
            dropped: self.dropped,
        }
    }
}

enum Command {
    Request,
    Shutdown,
}

enum Step {
    Transport(TransportEvent),
    Request,
}

/// Handle to a running [`Reader`].
pub struct ReaderHandle {
    state: Arc<RwLock<ReaderState>>,
    changed: watch::Receiver<u64>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    /// Snapshot of everything received.
    pub fn view(&self) -> ReaderView {
        self.state.read().view()
    }

    pub fn entries(&self) -> Vec<DiaryEntry> {
        self.state.read().entries.values().cloned().collect()
    }

    pub fn holder(&self) -> Option<PublicIdentity> {
        self.state.read().holder
    }

    /// Ask the holder to send every entry again.
    pub fn request(&self) -> Result<()> {
        self.commands
            .send(Command::Request)
            .map_err(|_| SyncError::Stopped)
    }

    /// A receiver that ticks whenever the view changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changed.clone()
    }

    /// Stop the reader and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

/// The reader side of the protocol.
pub struct Reader<T: Transport> {
    transport: Arc<T>,
    identity: Arc<Identity>,
    config: ReaderConfig,
    /// Connections of the bound holder, by transport peer.
    holders: HashMap<PeerId, PublicIdentity>,
    /// The holder whose entries the view holds.
    bound: Option<Ed25519PublicKey>,
    state: Arc<RwLock<ReaderState>>,
    changed: watch::Sender<u64>,
}

impl<T: Transport + 'static> Reader<T> {
    pub fn new(transport: Arc<T>, identity: Arc<Identity>, config: ReaderConfig) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            transport,
            identity,
            config,
            holders: HashMap::new(),
            bound: None,
            state: Arc::new(RwLock::new(ReaderState::default())),
            changed,
        }
    }

    /// Run the reader on a new task.
    pub fn spawn(self) -> ReaderHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let state = Arc::clone(&self.state);
        let changed = self.changed.subscribe();
        let task = tokio::spawn(self.run(rx));
        ReaderHandle {
            state,
            changed,
            commands,
            task,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let step = tokio::select! {
                event = self.transport.next_event() => event.map(Step::Transport),
                command = commands.recv() => match command {
                    Some(Command::Request) => Some(Step::Request),
                    Some(Command::Shutdown) | None => None,
                },
            };

            match step {
                Some(Step::Transport(event)) => self.on_event(event).await,
                Some(Step::Request) => self.request_all().await,
                None => break,
            }
        }
        debug!(reader = %self.identity.sign_public_key(), "reader stopped");
    }

    async fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(peer) => debug!(%peer, "peer connected"),
            TransportEvent::Disconnected(peer) => {
                if self.holders.remove(&peer).is_some() {
                    info!(%peer, "holder disconnected");
                    if self.holders.is_empty() {
                        self.state.write().holder = None;
                        self.notify();
                    }
                }
            }
            TransportEvent::Message { from, data } => match WireMessage::parse(&data) {
                Ok(message) => self.on_message(from, message).await,
                Err(e) => {
                    debug!(peer = %from, error = %e, "malformed frame dropped");
                    self.record_drop();
                }
            },
        }
    }

    async fn on_message(&mut self, from: PeerId, message: WireMessage) {
        match message {
            WireMessage::Challenge {
                challenge,
                service_public_key,
                service_enc_public_key,
            } => {
                let holder = PublicIdentity {
                    sign_public_key: service_public_key,
                    enc_public_key: service_enc_public_key,
                };
                self.on_challenge(from, holder, challenge).await;
            }
            WireMessage::Entry(sealed) => self.on_entry(from, &sealed),
            WireMessage::Announcement(sealed) => self.on_announcement(from, &sealed),
            other => {
                debug!(peer = %from, kind = other.kind(), "unexpected message dropped");
            }
        }
    }

    async fn on_challenge(
        &mut self,
        from: PeerId,
        holder: PublicIdentity,
        challenge: ChallengeNonce,
    ) {
        if let Some(expected) = self.config.expected_holder {
            if expected != holder.sign_public_key {
                debug!(
                    peer = %from,
                    holder = %holder.sign_public_key,
                    "challenge from unexpected holder ignored"
                );
                return;
            }
        }

        let connected = self.holders.values().next().map(|h| h.sign_public_key);
        if connected.is_some_and(|key| key != holder.sign_public_key) {
            debug!(
                peer = %from,
                holder = %holder.sign_public_key,
                "challenge from second holder ignored"
            );
            return;
        }

        let response = WireMessage::Response {
            signature: self.identity.sign(challenge.as_bytes()),
            public_key: self.identity.sign_public_key(),
        };
        if !self.send(from, &response).await {
            return;
        }

        self.holders.insert(from, holder);
        let previous = self.bound.replace(holder.sign_public_key);
        {
            let mut state = self.state.write();
            if previous.is_some_and(|key| key != holder.sign_public_key) {
                info!(holder = %holder.sign_public_key, "new holder, previous view cleared");
                state.entries.clear();
                state.announcements.clear();
            }
            state.holder = Some(holder);
        }
        self.notify();
        debug!(peer = %from, holder = %holder.sign_public_key, "challenge answered");

        if self.config.request_on_challenge {
            self.send(from, &WireMessage::Request).await;
        }
    }

    fn on_entry(&mut self, from: PeerId, sealed: &Sealed) {
        let Some(holder) = self.holders.get(&from).copied() else {
            debug!(peer = %from, "entry from unknown holder dropped");
            self.record_drop();
            return;
        };

        let entry = match self.open(&holder, sealed).and_then(|plaintext| {
            DiaryEntry::from_json(&plaintext).map_err(SyncError::from)
        }) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(peer = %from, error = %e, "entry dropped");
                self.record_drop();
                return;
            }
        };

        if entry.is_signed() {
            if let Err(e) = entry.verify(&holder.sign_public_key) {
                warn!(peer = %from, id = entry.id, error = %e, "entry signature invalid, dropped");
                self.record_drop();
                return;
            }
        }

        let id = entry.id;
        let inserted = {
            let mut state = self.state.write();
            match state.entries.entry(id) {
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(entry);
                    true
                }
                std::collections::btree_map::Entry::Occupied(_) => false,
            }
        };

        if inserted {
            debug!(peer = %from, id, "entry received");
            self.notify();
        }
    }

    fn on_announcement(&mut self, from: PeerId, sealed: &Sealed) {
        let Some(holder) = self.holders.get(&from).copied() else {
            self.record_drop();
            return;
        };

        let payload = self.open(&holder, sealed).and_then(|plaintext| {
            serde_json::from_slice::<serde_json::Value>(&plaintext)
                .map_err(|e| SyncError::MalformedMessage(e.to_string()))
        });

        match payload {
            Ok(payload) => {
                self.state.write().announcements.push(payload);
                self.notify();
            }
            Err(e) => {
                debug!(peer = %from, error = %e, "announcement dropped");
                self.record_drop();
            }
        }
    }

    fn open(&self, holder: &PublicIdentity, sealed: &Sealed) -> Result<Vec<u8>> {
        Ok(sealed.open(self.identity.encryption_secret(), &holder.enc_public_key)?)
    }

    async fn request_all(&mut self) {
        let holders: Vec<PeerId> = self.holders.keys().copied().collect();
        for peer in holders {
            self.send(peer, &WireMessage::Request).await;
        }
    }

    async fn send(&self, peer: PeerId, message: &WireMessage) -> bool {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%peer, error = %e, "failed to encode frame");
                return false;
            }
        };
        match self.transport.send(&peer, frame).await {
            Ok(()) => true,
            Err(e) => {
                debug!(%peer, error = %e, "send failed");
                false
            }
        }
    }

    fn record_drop(&self) {
        self.state.write().dropped += 1;
        self.notify();
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version += 1);
    }
}
