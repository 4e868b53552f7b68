//! Sealed envelopes: one ciphertext per recipient.
//!
//! There is no group key. Broadcasting a payload to N readers seals it N
//! times, each with its own key agreement and its own random nonce.

use serde::{Deserialize, Serialize};

use trustdiary_core::encoding::base64_bytes;
use trustdiary_core::{X25519PublicKey, X25519SecretKey};

use crate::crypto::{EncryptionKey, SealNonce, SharedKey};
use crate::error::Result;

/// An encrypted payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    /// Random per-message nonce.
    pub nonce: SealNonce,

    /// Ciphertext including the Poly1305 tag.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// Seal `plaintext` from `sender` to `recipient`.
    pub fn seal(
        sender: &X25519SecretKey,
        recipient: &X25519PublicKey,
        plaintext: &[u8],
    ) -> Result<Self> {
        let key = pair_key(sender, &sender.public_key(), recipient);
        let nonce = SealNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Open an envelope addressed to `recipient` from `sender`.
    ///
    /// Fails with [`TrustError::Decryption`](crate::TrustError::Decryption)
    /// for any other key pair or any modified byte.
    pub fn open(&self, recipient: &X25519SecretKey, sender: &X25519PublicKey) -> Result<Vec<u8>> {
        let key = pair_key(recipient, &recipient.public_key(), sender);
        key.decrypt(&self.ciphertext, &self.nonce)
    }
}

/// Key shared by two parties, independent of which side derives it.
fn pair_key(
    local_secret: &X25519SecretKey,
    local_public: &X25519PublicKey,
    peer_public: &X25519PublicKey,
) -> EncryptionKey {
    let (first, second) = if local_public.as_bytes() <= peer_public.as_bytes() {
        (local_public, peer_public)
    } else {
        (peer_public, local_public)
    };

    let mut context = [0u8; 64];
    context[..32].copy_from_slice(first.as_bytes());
    context[32..].copy_from_slice(second.as_bytes());

    SharedKey::agree(local_secret, peer_public).derive_encryption_key(&context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrustError;
    use proptest::prelude::*;

    #[test]
    fn test_seal_open() {
        let holder = X25519SecretKey::generate();
        let reader = X25519SecretKey::generate();

        let sealed = Sealed::seal(&holder, &reader.public_key(), b"dear diary").unwrap();
        let opened = sealed.open(&reader, &holder.public_key()).unwrap();
        assert_eq!(opened, b"dear diary");
    }

    #[test]
    fn test_other_reader_cannot_open() {
        let holder = X25519SecretKey::generate();
        let reader = X25519SecretKey::generate();
        let eavesdropper = X25519SecretKey::generate();

        let sealed = Sealed::seal(&holder, &reader.public_key(), b"private").unwrap();
        assert!(matches!(
            sealed.open(&eavesdropper, &holder.public_key()),
            Err(TrustError::Decryption)
        ));
    }

    #[test]
    fn test_same_plaintext_seals_differently() {
        let holder = X25519SecretKey::generate();
        let reader = X25519SecretKey::generate().public_key();

        let a = Sealed::seal(&holder, &reader, b"same").unwrap();
        let b = Sealed::seal(&holder, &reader, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let holder = X25519SecretKey::generate();
        let reader = X25519SecretKey::generate();

        let mut sealed = Sealed::seal(&holder, &reader.public_key(), b"data").unwrap();
        sealed.ciphertext[0] ^= 1;
        assert!(sealed.open(&reader, &holder.public_key()).is_err());
    }

    #[test]
    fn test_wire_form_is_base64() {
        let holder = X25519SecretKey::generate();
        let reader = X25519SecretKey::generate();
        let sealed = Sealed::seal(&holder, &reader.public_key(), b"x").unwrap();

        let json = serde_json::to_value(&sealed).unwrap();
        let nonce = json["nonce"].as_str().unwrap();
        assert_eq!(trustdiary_core::encoding::decode(nonce).unwrap().len(), 24);
        assert!(json["ciphertext"].is_string());

        let back: Sealed = serde_json::from_value(json).unwrap();
        assert_eq!(back, sealed);
    }

    proptest! {
        #[test]
        fn prop_only_addressed_reader_opens(
            holder_seed in any::<[u8; 32]>(),
            reader_seed in any::<[u8; 32]>(),
            other_seed in any::<[u8; 32]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let holder = X25519SecretKey::from_bytes(holder_seed);
            let reader = X25519SecretKey::from_bytes(reader_seed);
            let other = X25519SecretKey::from_bytes(other_seed);
            prop_assume!(other.public_key() != reader.public_key());

            let sealed = Sealed::seal(&holder, &reader.public_key(), &plaintext).unwrap();
            prop_assert_eq!(sealed.open(&reader, &holder.public_key()).unwrap(), plaintext);
            prop_assert!(sealed.open(&other, &holder.public_key()).is_err());
        }
    }
}
