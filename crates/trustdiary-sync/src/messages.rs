//! Wire messages.
//!
//! Every transport frame is one JSON object tagged by `"type"`. Frames are
//! parsed into [`WireMessage`] once at the boundary; anything that does not
//! parse is dropped there.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use trustdiary_core::{base64_serde, Ed25519PublicKey, Ed25519Signature, X25519PublicKey};
use trustdiary_trust::Sealed;

use crate::error::{Result, SyncError};

/// Length of a challenge nonce in bytes.
pub const CHALLENGE_LEN: usize = 32;

/// A single-use authentication challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeNonce(pub [u8; CHALLENGE_LEN]);

base64_serde!(ChallengeNonce, CHALLENGE_LEN);

impl ChallengeNonce {
    /// Generate a fresh random challenge.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CHALLENGE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// The bytes the responder signs.
    pub const fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }
}

/// Protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// Holder to reader: prove possession of your signing key.
    Challenge {
        challenge: ChallengeNonce,
        #[serde(rename = "servicePublicKey")]
        service_public_key: Ed25519PublicKey,
        #[serde(rename = "serviceEncPublicKey", alias = "serviceBoxPublicKey")]
        service_enc_public_key: X25519PublicKey,
    },

    /// Reader to holder: signature over the raw challenge bytes.
    Response {
        signature: Ed25519Signature,
        #[serde(rename = "publicKey")]
        public_key: Ed25519PublicKey,
    },

    /// Reader to holder: send me every entry.
    Request,

    /// Holder to reader: one sealed `DiaryEntry`.
    Entry(Sealed),

    /// Holder to reader: a sealed presence payload.
    Announcement(Sealed),
}

impl WireMessage {
    /// Parse one transport frame.
    pub fn parse(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(|e| SyncError::MalformedMessage(e.to_string()))
    }

    /// Encode as one transport frame.
    pub fn to_frame(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SyncError::MalformedMessage(e.to_string()))
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Challenge { .. } => "challenge",
            WireMessage::Response { .. } => "response",
            WireMessage::Request => "request",
            WireMessage::Entry(_) => "entry",
            WireMessage::Announcement(_) => "announcement",
        }
    }
}
