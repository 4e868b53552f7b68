//! Identity: the signing and encryption keypairs owned by one process.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, X25519PublicKey, X25519SecretKey};
use crate::error::CoreError;
use crate::types::now_millis;

/// The public half of an identity, exchanged with peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub sign_public_key: Ed25519PublicKey,
    pub enc_public_key: X25519PublicKey,
}

/// A full identity: an Ed25519 signing keypair and an X25519 encryption keypair.
///
/// Created once, persisted, and never rotated.
#[derive(Clone)]
pub struct Identity {
    signing: Keypair,
    encryption: X25519SecretKey,
    created_at: i64,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            signing: Keypair::generate(),
            encryption: X25519SecretKey::generate(),
            created_at: now_millis(),
        }
    }

    /// Build a deterministic identity from seeds.
    pub fn from_seeds(sign_seed: [u8; 32], enc_secret: [u8; 32]) -> Self {
        Self {
            signing: Keypair::from_seed(&sign_seed),
            encryption: X25519SecretKey::from_bytes(enc_secret),
            created_at: 0,
        }
    }

    pub fn sign_public_key(&self) -> Ed25519PublicKey {
        self.signing.public_key()
    }

    pub fn enc_public_key(&self) -> X25519PublicKey {
        self.encryption.public_key()
    }

    /// The public identity to hand to peers.
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            sign_public_key: self.sign_public_key(),
            enc_public_key: self.enc_public_key(),
        }
    }

    /// Sign a message with the identity's signing key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.signing.sign(message)
    }

    pub fn keypair(&self) -> &Keypair {
        &self.signing
    }

    pub fn encryption_secret(&self) -> &X25519SecretKey {
        &self.encryption
    }

    /// When the identity was first created (Unix ms).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Export the identity for persistence.
    pub fn to_record(&self) -> IdentityRecord {
        IdentityRecord {
            sign_seed: self.signing.seed(),
            sign_public_key: self.sign_public_key(),
            enc_secret: self.encryption.to_bytes(),
            enc_public_key: self.enc_public_key(),
            created_at: self.created_at,
        }
    }

    /// Rebuild an identity from a persisted record.
    ///
    /// The stored public keys must match the ones derived from the stored
    /// secrets; anything else means the record is corrupt.
    pub fn from_record(record: &IdentityRecord) -> Result<Self, CoreError> {
        let signing = Keypair::from_seed(&record.sign_seed);
        if signing.public_key() != record.sign_public_key {
            return Err(CoreError::IdentityMismatch(
                "signing seed does not derive stored public key".into(),
            ));
        }

        let encryption = X25519SecretKey::from_bytes(record.enc_secret);
        if encryption.public_key() != record.enc_public_key {
            return Err(CoreError::IdentityMismatch(
                "encryption secret does not derive stored public key".into(),
            ));
        }

        Ok(Self {
            signing,
            encryption,
            created_at: record.created_at,
        })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.sign_public_key())
    }
}

/// Persisted form of an [`Identity`].
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub sign_seed: [u8; 32],
    pub sign_public_key: Ed25519PublicKey,
    pub enc_secret: [u8; 32],
    pub enc_public_key: X25519PublicKey,
    pub created_at: i64,
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("sign_public_key", &self.sign_public_key)
            .field("enc_public_key", &self.enc_public_key)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip_preserves_keys() {
        let identity = Identity::generate();
        let restored = Identity::from_record(&identity.to_record()).unwrap();

        assert_eq!(restored.public(), identity.public());
        assert_eq!(restored.created_at(), identity.created_at());
    }

    #[test]
    fn test_tampered_record_is_rejected() {
        let identity = Identity::generate();
        let mut record = identity.to_record();
        record.sign_seed[0] ^= 0xff;

        assert!(matches!(
            Identity::from_record(&record),
            Err(CoreError::IdentityMismatch(_))
        ));
    }

    #[test]
    fn test_mismatched_encryption_key_is_rejected() {
        let identity = Identity::generate();
        let mut record = identity.to_record();
        record.enc_public_key = Identity::generate().enc_public_key();

        assert!(Identity::from_record(&record).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let identity = Identity::from_seeds([9u8; 32], [3u8; 32]);
        let record = format!("{:?}", identity.to_record());
        assert!(!record.contains("sign_seed"));
        assert!(!record.contains("enc_secret"));
    }

    #[test]
    fn test_public_identity_json_field_names() {
        let identity = Identity::from_seeds([1u8; 32], [2u8; 32]);
        let json = serde_json::to_value(identity.public()).unwrap();
        assert!(json.get("signPublicKey").is_some());
        assert!(json.get("encPublicKey").is_some());
    }
}
