//! Holder-side sync engine.
//!
//! One task owns every peer session. It reacts to transport events, new log
//! entries, a periodic sweep and commands from an [`EngineHandle`]. Frames
//! for a peer go into that peer's queue and are written by one writer task
//! per peer, so per-peer order matches the order frames were queued.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use trustdiary_core::{DiaryEntry, Ed25519PublicKey, Identity, TrustRecord};
use trustdiary_store::EntryLog;
use trustdiary_trust::{Sealed, TrustStore};

use crate::error::{Result, SyncError};
use crate::messages::WireMessage;
use crate::session::{AuthError, AuthOutcome, AuthSession, SessionState};
use crate::transport::{PeerId, Transport, TransportEvent};

/// Floor for the sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for the holder engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a challenge may stay unanswered.
    pub challenge_timeout: Duration,
    /// How often outstanding challenges are checked for expiry. Values
    /// below one millisecond are raised to one millisecond.
    pub sweep_interval: Duration,
    /// Responses tolerated without an outstanding challenge before the
    /// peer is disconnected.
    pub max_stray_responses: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            challenge_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            max_stray_responses: 3,
        }
    }
}

impl SyncConfig {
    pub fn with_challenge_timeout(mut self, timeout: Duration) -> Self {
        self.challenge_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_stray_responses(mut self, max: u32) -> Self {
        self.max_stray_responses = max;
        self
    }
}

/// Point-in-time view of one peer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub peer: PeerId,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_public_key: Option<Ed25519PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

enum Command {
    Announce {
        payload: serde_json::Value,
        reply: oneshot::Sender<usize>,
    },
    Sessions(oneshot::Sender<Vec<SessionSnapshot>>),
    Shutdown,
}

/// Control handle for a running [`SyncEngine`].
///
/// Dropping the handle stops the engine.
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Seal `payload` for every authenticated peer and send it.
    ///
    /// Returns the number of peers it was queued for.
    pub async fn announce(&self, payload: serde_json::Value) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Announce { payload, reply })
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)
    }

    /// Snapshot of every live session.
    pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Sessions(reply))
            .map_err(|_| SyncError::Stopped)?;
        rx.await.map_err(|_| SyncError::Stopped)
    }

    /// Stop the engine and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

struct PeerSlot {
    session: AuthSession,
    outbound: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
}

impl Drop for PeerSlot {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

enum Step {
    Transport(TransportEvent),
    Appended(std::result::Result<DiaryEntry, broadcast::error::RecvError>),
    Sweep,
    Command(Command),
    Stop,
}

/// The holder side of the protocol.
pub struct SyncEngine<T: Transport> {
    transport: Arc<T>,
    identity: Arc<Identity>,
    trust: Arc<TrustStore>,
    log: Arc<EntryLog>,
    config: SyncConfig,
    peers: HashMap<PeerId, PeerSlot>,
}

impl<T: Transport + 'static> SyncEngine<T> {
    pub fn new(
        transport: Arc<T>,
        identity: Arc<Identity>,
        trust: Arc<TrustStore>,
        log: Arc<EntryLog>,
        config: SyncConfig,
    ) -> Self {
        Self {
            transport,
            identity,
            trust,
            log,
            config,
            peers: HashMap::new(),
        }
    }

    /// Run the engine on a new task.
    pub fn spawn(self) -> EngineHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        EngineHandle { commands, task }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut appended = self.log.subscribe();
        let period = self.config.sweep_interval.max(MIN_SWEEP_INTERVAL);
        let mut sweep = tokio::time::interval(period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            holder = %self.identity.sign_public_key(),
            peer = %self.transport.local_peer_id(),
            "sync engine started"
        );

        loop {
            let step = tokio::select! {
                event = self.transport.next_event() => match event {
                    Some(event) => Step::Transport(event),
                    None => Step::Stop,
                },
                entry = appended.recv() => Step::Appended(entry),
                _ = sweep.tick() => Step::Sweep,
                command = commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Stop,
                },
            };

            match step {
                Step::Transport(event) => self.on_transport_event(event).await,
                Step::Appended(Ok(entry)) => self.broadcast_entry(&entry),
                Step::Appended(Err(broadcast::error::RecvError::Lagged(missed))) => {
                    warn!(missed, "entry notifications lagged, resending logs");
                    let peers: Vec<PeerId> = self.peers.keys().copied().collect();
                    for peer in peers {
                        self.push_log(peer);
                    }
                }
                Step::Appended(Err(broadcast::error::RecvError::Closed)) => break,
                Step::Sweep => self.sweep().await,
                Step::Command(Command::Announce { payload, reply }) => {
                    let _ = reply.send(self.announce(&payload));
                }
                Step::Command(Command::Sessions(reply)) => {
                    let _ = reply.send(self.snapshots());
                }
                Step::Command(Command::Shutdown) | Step::Stop => break,
            }
        }

        self.peers.clear();
        info!("sync engine stopped");
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(peer) => self.on_connected(peer),
            TransportEvent::Disconnected(peer) => {
                if let Some(mut slot) = self.peers.remove(&peer) {
                    slot.session.disconnect();
                    info!(%peer, "peer disconnected");
                }
            }
            TransportEvent::Message { from, data } => self.on_message(from, &data).await,
        }
    }

    fn on_connected(&mut self, peer: PeerId) {
        if self.peers.contains_key(&peer) {
            debug!(%peer, "duplicate connect ignored");
            return;
        }

        let (outbound, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_frames(Arc::clone(&self.transport), peer, rx));
        let mut session = AuthSession::new(peer);

        let challenge = session.issue_challenge(Instant::now()).map(|challenge| {
            WireMessage::Challenge {
                challenge,
                service_public_key: self.identity.sign_public_key(),
                service_enc_public_key: self.identity.enc_public_key(),
            }
        });

        self.peers.insert(
            peer,
            PeerSlot {
                session,
                outbound,
                writer,
            },
        );

        if let Some(challenge) = challenge {
            self.queue(peer, &challenge);
            debug!(%peer, "challenge sent");
        }
    }

    async fn on_message(&mut self, from: PeerId, data: &str) {
        if !self.peers.contains_key(&from) {
            debug!(peer = %from, "frame from unknown peer dropped");
            return;
        }

        let message = match WireMessage::parse(data) {
            Ok(message) => message,
            Err(e) => {
                debug!(peer = %from, error = %e, "malformed frame dropped");
                return;
            }
        };

        match message {
            WireMessage::Response {
                signature,
                public_key,
            } => self.on_response(from, &public_key, &signature).await,
            WireMessage::Request => {
                let authenticated = self
                    .peers
                    .get(&from)
                    .is_some_and(|slot| slot.session.is_authenticated());
                if authenticated {
                    debug!(peer = %from, "entry request");
                    self.push_log(from);
                } else {
                    debug!(peer = %from, "request from unauthenticated peer dropped");
                }
            }
            other => {
                debug!(peer = %from, kind = other.kind(), "unexpected message dropped");
            }
        }
    }

    async fn on_response(
        &mut self,
        peer: PeerId,
        public_key: &Ed25519PublicKey,
        signature: &trustdiary_core::Ed25519Signature,
    ) {
        let trust = Arc::clone(&self.trust);
        let max_stray = self.config.max_stray_responses;

        let Some(slot) = self.peers.get_mut(&peer) else {
            return;
        };

        match slot
            .session
            .verify_response(public_key, signature, |key| trust.lookup(key))
        {
            AuthOutcome::Authenticated(record) => {
                info!(%peer, key = %public_key, name = %record.display_name, "peer authenticated");
                self.push_log(peer);
            }
            AuthOutcome::Untrusted => {
                info!(
                    %peer,
                    key = %public_key,
                    reason = %AuthError::UnknownKey,
                    "peer not trusted"
                );
            }
            AuthOutcome::Rejected(reason) => {
                warn!(%peer, key = %public_key, %reason, "peer rejected");
            }
            AuthOutcome::Ignored(reason) => {
                let strays = slot.session.stray_responses();
                debug!(%peer, %reason, strays, "response ignored");
                if strays > max_stray {
                    warn!(%peer, strays, "too many stray responses, disconnecting");
                    self.drop_peer(peer).await;
                }
            }
        }
    }

    async fn sweep(&mut self) {
        let now = Instant::now();
        let ttl = self.config.challenge_timeout;

        let expired: Vec<PeerId> = self
            .peers
            .iter_mut()
            .filter(|(_, slot)| !slot.session.state().is_terminal())
            .filter_map(|(peer, slot)| slot.session.expire(now, ttl).then_some(*peer))
            .collect();

        for peer in expired {
            warn!(%peer, reason = %AuthError::ChallengeExpired, "peer rejected");
            self.drop_peer(peer).await;
        }
    }

    /// Forget a peer and ask the transport to cut it off.
    async fn drop_peer(&mut self, peer: PeerId) {
        if let Some(mut slot) = self.peers.remove(&peer) {
            slot.session.disconnect();
        }
        self.transport.disconnect(&peer).await;
    }

    /// Send every entry, oldest first, to one authenticated reader.
    fn push_log(&self, peer: PeerId) {
        let Some(record) = self.readable_record(peer) else {
            return;
        };

        let entries = self.log.all();
        let mut sent = 0;
        for entry in &entries {
            if self.send_entry(peer, &record, entry) {
                sent += 1;
            }
        }
        debug!(%peer, sent, "log pushed");
    }

    fn broadcast_entry(&self, entry: &DiaryEntry) {
        for peer in self.peers.keys() {
            if let Some(record) = self.readable_record(*peer) {
                self.send_entry(*peer, &record, entry);
            }
        }
    }

    fn announce(&self, payload: &serde_json::Value) -> usize {
        let plaintext = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "announcement not serializable");
                return 0;
            }
        };

        let mut count = 0;
        for (peer, slot) in &self.peers {
            let Some(record) = slot.session.authenticated() else {
                continue;
            };
            match Sealed::seal(
                self.identity.encryption_secret(),
                &record.enc_public_key,
                &plaintext,
            ) {
                Ok(sealed) => {
                    if self.queue(*peer, &WireMessage::Announcement(sealed)) {
                        count += 1;
                    }
                }
                Err(e) => warn!(%peer, error = %e, "failed to seal announcement"),
            }
        }
        count
    }

    /// The peer's trust record, if it is authenticated and may read entries.
    fn readable_record(&self, peer: PeerId) -> Option<TrustRecord> {
        let record = self.peers.get(&peer)?.session.authenticated()?;
        if !record.permissions.can_read() {
            debug!(%peer, "peer lacks read permission, entries withheld");
            return None;
        }
        Some(record.clone())
    }

    fn send_entry(&self, peer: PeerId, record: &TrustRecord, entry: &DiaryEntry) -> bool {
        let sealed = entry
            .to_json()
            .map_err(SyncError::from)
            .and_then(|plaintext| {
                Sealed::seal(
                    self.identity.encryption_secret(),
                    &record.enc_public_key,
                    &plaintext,
                )
                .map_err(SyncError::from)
            });

        match sealed {
            Ok(sealed) => self.queue(peer, &WireMessage::Entry(sealed)),
            Err(e) => {
                warn!(%peer, id = entry.id, error = %e, "failed to seal entry");
                false
            }
        }
    }

    /// Queue a frame on the peer's ordered outbound queue.
    fn queue(&self, peer: PeerId, message: &WireMessage) -> bool {
        let Some(slot) = self.peers.get(&peer) else {
            return false;
        };
        match message.to_frame() {
            Ok(frame) => slot.outbound.send(frame).is_ok(),
            Err(e) => {
                warn!(%peer, error = %e, "failed to encode frame");
                false
            }
        }
    }

    fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .peers
            .values()
            .map(|slot| {
                let record = slot.session.authenticated();
                SessionSnapshot {
                    peer: slot.session.peer(),
                    state: slot.session.state(),
                    sign_public_key: record.map(|r| r.sign_public_key),
                    display_name: record.map(|r| r.display_name.clone()),
                }
            })
            .collect();
        snapshots.sort_by_key(|s| s.peer);
        snapshots
    }
}

/// Drain one peer's queue into the transport, in order.
async fn write_frames<T: Transport>(
    transport: Arc<T>,
    peer: PeerId,
    mut frames: mpsc::UnboundedReceiver<String>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = transport.send(&peer, frame).await {
            debug!(%peer, error = %e, "writer stopped");
            break;
        }
    }
}
