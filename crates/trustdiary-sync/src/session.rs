//! Per-peer authentication state machine.
//!
//! ```text
//! Connected ──issue_challenge──▶ Challenged ──verify_response──▶ Authenticated
//!                                     │                          Untrusted
//!                                     └──expire / bad signature─▶ Rejected
//! any ──disconnect──▶ Disconnected
//! ```
//!
//! The challenge is taken out of the session before the signature is
//! checked, so every challenge is verified at most once whatever the outcome.

use serde::Serialize;
use thiserror::Error;
use tokio::time::{Duration, Instant};

use trustdiary_core::{Ed25519PublicKey, Ed25519Signature, TrustRecord};

use crate::messages::ChallengeNonce;
use crate::transport::PeerId;

/// Session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Transport reported the peer; nothing sent yet.
    Connected,
    /// A challenge is outstanding.
    Challenged,
    /// Valid signature from a trusted key.
    Authenticated,
    /// Valid signature from a key that is not trusted. Kept open, inert.
    Untrusted,
    /// Bad signature or expired challenge.
    Rejected,
    /// The peer is gone.
    Disconnected,
}

impl SessionState {
    /// Whether the handshake has settled. Settled sessions never change
    /// state again except through disconnect.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Connected | SessionState::Challenged)
    }
}

/// Why an authentication attempt failed. Logged locally, never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("signature does not verify against the outstanding challenge")]
    BadSignature,

    #[error("signing key is not in the trust list")]
    UnknownKey,

    #[error("no outstanding challenge")]
    NoOutstandingChallenge,

    #[error("challenge expired")]
    ChallengeExpired,
}

/// Result of processing one `response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session is now authenticated as this record.
    Authenticated(TrustRecord),
    /// The signature was valid but the key is not trusted.
    Untrusted,
    /// The session is now rejected.
    Rejected(AuthError),
    /// The response did not change the session.
    Ignored(AuthError),
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    nonce: ChallengeNonce,
    issued_at: Instant,
}

/// Authentication state for one connected peer.
#[derive(Debug)]
pub struct AuthSession {
    peer: PeerId,
    state: SessionState,
    outstanding: Option<Outstanding>,
    authenticated: Option<TrustRecord>,
    stray_responses: u32,
}

impl AuthSession {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            state: SessionState::Connected,
            outstanding: None,
            authenticated: None,
            stray_responses: 0,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The trust record the peer authenticated as.
    pub fn authenticated(&self) -> Option<&TrustRecord> {
        self.authenticated.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Responses received while no challenge was outstanding.
    pub fn stray_responses(&self) -> u32 {
        self.stray_responses
    }

    /// Generate and remember a fresh challenge.
    ///
    /// Only valid in `Connected`; returns `None` otherwise.
    pub fn issue_challenge(&mut self, now: Instant) -> Option<ChallengeNonce> {
        if self.state != SessionState::Connected {
            return None;
        }

        let nonce = ChallengeNonce::generate();
        self.outstanding = Some(Outstanding {
            nonce,
            issued_at: now,
        });
        self.state = SessionState::Challenged;
        Some(nonce)
    }

    /// Process a `response` claiming `claimed_key`.
    ///
    /// `lookup` is consulted only after the signature verifies.
    pub fn verify_response<F>(
        &mut self,
        claimed_key: &Ed25519PublicKey,
        signature: &Ed25519Signature,
        lookup: F,
    ) -> AuthOutcome
    where
        F: FnOnce(&Ed25519PublicKey) -> Option<TrustRecord>,
    {
        let Some(outstanding) = self.outstanding.take() else {
            self.stray_responses = self.stray_responses.saturating_add(1);
            return AuthOutcome::Ignored(AuthError::NoOutstandingChallenge);
        };

        if claimed_key
            .verify(outstanding.nonce.as_bytes(), signature)
            .is_err()
        {
            self.state = SessionState::Rejected;
            return AuthOutcome::Rejected(AuthError::BadSignature);
        }

        match lookup(claimed_key) {
            Some(record) => {
                self.state = SessionState::Authenticated;
                self.authenticated = Some(record.clone());
                AuthOutcome::Authenticated(record)
            }
            None => {
                self.state = SessionState::Untrusted;
                AuthOutcome::Untrusted
            }
        }
    }

    /// Reject the session if its challenge has been outstanding for `ttl`.
    ///
    /// Returns whether the session was rejected by this call.
    pub fn expire(&mut self, now: Instant, ttl: Duration) -> bool {
        match self.outstanding {
            Some(outstanding) if now.saturating_duration_since(outstanding.issued_at) >= ttl => {
                self.outstanding = None;
                self.state = SessionState::Rejected;
                true
            }
            _ => false,
        }
    }

    /// Forget everything about the peer.
    pub fn disconnect(&mut self) {
        self.outstanding = None;
        self.authenticated = None;
        self.state = SessionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustdiary_core::{Identity, PermissionSet};

    fn trusted(identity: &Identity) -> TrustRecord {
        TrustRecord::new(
            identity.sign_public_key(),
            identity.enc_public_key(),
            "reader",
            PermissionSet::new(),
        )
    }

    #[test]
    fn test_trusted_signature_authenticates() {
        let reader = Identity::generate();
        let record = trusted(&reader);
        let mut session = AuthSession::new(PeerId::random());

        let nonce = session.issue_challenge(Instant::now()).unwrap();
        assert_eq!(session.state(), SessionState::Challenged);

        let outcome = session.verify_response(
            &reader.sign_public_key(),
            &reader.sign(nonce.as_bytes()),
            |_| Some(record.clone()),
        );

        assert_eq!(outcome, AuthOutcome::Authenticated(record.clone()));
        assert!(session.is_authenticated());
        assert_eq!(session.authenticated(), Some(&record));
    }

    #[test]
    fn test_untrusted_key_is_inert() {
        let stranger = Identity::generate();
        let mut session = AuthSession::new(PeerId::random());
        let nonce = session.issue_challenge(Instant::now()).unwrap();

        let outcome = session.verify_response(
            &stranger.sign_public_key(),
            &stranger.sign(nonce.as_bytes()),
            |_| None,
        );

        assert_eq!(outcome, AuthOutcome::Untrusted);
        assert_eq!(session.state(), SessionState::Untrusted);
        assert!(session.authenticated().is_none());
    }

    #[test]
    fn test_stale_signature_is_rejected() {
        let reader = Identity::generate();
        let record = trusted(&reader);

        let mut previous = AuthSession::new(PeerId::random());
        let stale = previous.issue_challenge(Instant::now()).unwrap();
        let stale_signature = reader.sign(stale.as_bytes());

        let mut session = AuthSession::new(PeerId::random());
        session.issue_challenge(Instant::now()).unwrap();

        let outcome =
            session.verify_response(&reader.sign_public_key(), &stale_signature, |_| {
                Some(record.clone())
            });

        assert_eq!(outcome, AuthOutcome::Rejected(AuthError::BadSignature));
        assert_eq!(session.state(), SessionState::Rejected);
    }

    #[test]
    fn test_signature_under_other_key_is_rejected() {
        let reader = Identity::generate();
        let impostor = Identity::generate();
        let mut session = AuthSession::new(PeerId::random());
        let nonce = session.issue_challenge(Instant::now()).unwrap();

        let outcome = session.verify_response(
            &reader.sign_public_key(),
            &impostor.sign(nonce.as_bytes()),
            |_| Some(trusted(&reader)),
        );
        assert_eq!(outcome, AuthOutcome::Rejected(AuthError::BadSignature));
    }

    #[test]
    fn test_challenge_is_single_use() {
        let reader = Identity::generate();
        let mut session = AuthSession::new(PeerId::random());
        let nonce = session.issue_challenge(Instant::now()).unwrap();
        let signature = reader.sign(nonce.as_bytes());

        // First attempt consumes the challenge even though it is untrusted.
        session.verify_response(&reader.sign_public_key(), &signature, |_| None);

        let replay = session.verify_response(&reader.sign_public_key(), &signature, |_| {
            Some(trusted(&reader))
        });
        assert_eq!(
            replay,
            AuthOutcome::Ignored(AuthError::NoOutstandingChallenge)
        );
        assert_eq!(session.state(), SessionState::Untrusted);
        assert_eq!(session.stray_responses(), 1);
    }

    #[test]
    fn test_lookup_not_consulted_for_bad_signature() {
        let reader = Identity::generate();
        let mut session = AuthSession::new(PeerId::random());
        session.issue_challenge(Instant::now()).unwrap();

        let mut consulted = false;
        session.verify_response(&reader.sign_public_key(), &reader.sign(b"other"), |_| {
            consulted = true;
            None
        });
        assert!(!consulted);
    }

    #[test]
    fn test_challenge_expires() {
        let mut session = AuthSession::new(PeerId::random());
        let start = Instant::now();
        session.issue_challenge(start).unwrap();

        assert!(!session.expire(start + Duration::from_secs(5), Duration::from_secs(10)));
        assert!(session.expire(start + Duration::from_secs(10), Duration::from_secs(10)));
        assert_eq!(session.state(), SessionState::Rejected);

        // Expired challenges cannot be answered.
        let reader = Identity::generate();
        let outcome =
            session.verify_response(&reader.sign_public_key(), &reader.sign(b""), |_| None);
        assert_eq!(outcome, AuthOutcome::Ignored(AuthError::NoOutstandingChallenge));
    }

    #[test]
    fn test_challenge_issued_once() {
        let mut session = AuthSession::new(PeerId::random());
        assert!(session.issue_challenge(Instant::now()).is_some());
        assert!(session.issue_challenge(Instant::now()).is_none());
    }

    #[test]
    fn test_disconnect_discards_everything() {
        let reader = Identity::generate();
        let mut session = AuthSession::new(PeerId::random());
        let nonce = session.issue_challenge(Instant::now()).unwrap();
        let signature = reader.sign(nonce.as_bytes());

        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.state().is_terminal());

        let outcome = session.verify_response(&reader.sign_public_key(), &signature, |_| {
            Some(trusted(&reader))
        });
        assert!(matches!(outcome, AuthOutcome::Ignored(_)));
    }
}
