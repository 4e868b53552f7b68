//! Rendezvous identifiers: channel names every participant can compute alone.
//!
//! Derived from public keys only. Participant keys are sorted and
//! deduplicated before hashing, so the id does not depend on who computes it.
//! Truncation lengths are fixed constants; peers that truncate differently
//! never meet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Ed25519PublicKey;

/// Length of a pairwise rendezvous id (hex characters).
pub const PAIRWISE_ID_LEN: usize = 16;

/// Length of a service rendezvous id (hex characters).
pub const SERVICE_ID_LEN: usize = 20;

/// Default salt of the service model.
pub const DEFAULT_ROOM_SALT: &str = "trust-diary-v1";

const DERIVE_CONTEXT: &str = "trustdiary 2024 rendezvous id v1";

/// A derived, non-stored channel identifier (lowercase hex).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RendezvousId(String);

impl RendezvousId {
    /// Derive an id from a set of participant keys and a salt.
    ///
    /// `len` is clamped to the 64 hex characters of the full digest.
    pub fn derive(keys: &[Ed25519PublicKey], salt: &[u8], len: usize) -> Self {
        let mut sorted = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut hasher = blake3::Hasher::new_derive_key(DERIVE_CONTEXT);
        hasher.update(salt);
        for key in &sorted {
            hasher.update(key.as_bytes());
        }

        let digest = hasher.finalize().to_hex();
        let len = len.min(digest.len());
        Self(digest[..len].to_string())
    }

    /// Pairwise model: both parties derive the same id from their two keys.
    pub fn pairwise(a: &Ed25519PublicKey, b: &Ed25519PublicKey) -> Self {
        Self::derive(&[*a, *b], &[], PAIRWISE_ID_LEN)
    }

    /// Service model: `salt ":"` followed by the service signing key.
    pub fn service(salt: &str, service_key: &Ed25519PublicKey) -> Self {
        let salt = format!("{salt}:");
        Self::derive(&[*service_key], salt.as_bytes(), SERVICE_ID_LEN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RendezvousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RendezvousId({})", self.0)
    }
}

impl fmt::Display for RendezvousId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RendezvousId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use proptest::prelude::*;

    #[test]
    fn test_pairwise_is_order_independent() {
        let a = Keypair::generate().public_key();
        let b = Keypair::generate().public_key();

        assert_eq!(RendezvousId::pairwise(&a, &b), RendezvousId::pairwise(&b, &a));
        assert_eq!(RendezvousId::pairwise(&a, &b).as_str().len(), PAIRWISE_ID_LEN);
    }

    #[test]
    fn test_different_pairs_differ() {
        let a = Keypair::from_seed(&[1; 32]).public_key();
        let b = Keypair::from_seed(&[2; 32]).public_key();
        let c = Keypair::from_seed(&[3; 32]).public_key();

        assert_ne!(RendezvousId::pairwise(&a, &b), RendezvousId::pairwise(&a, &c));
    }

    #[test]
    fn test_service_id_depends_on_salt() {
        let key = Keypair::from_seed(&[7; 32]).public_key();
        let id = RendezvousId::service(DEFAULT_ROOM_SALT, &key);

        assert_eq!(id.as_str().len(), SERVICE_ID_LEN);
        assert_eq!(id, RendezvousId::service(DEFAULT_ROOM_SALT, &key));
        assert_ne!(id, RendezvousId::service("other-salt", &key));
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let a = Keypair::from_seed(&[4; 32]).public_key();
        assert_eq!(
            RendezvousId::derive(&[a, a], b"s", 32),
            RendezvousId::derive(&[a], b"s", 32)
        );
    }

    #[test]
    fn test_len_is_clamped() {
        let a = Keypair::from_seed(&[5; 32]).public_key();
        assert_eq!(RendezvousId::derive(&[a], b"", 500).as_str().len(), 64);
    }

    proptest! {
        #[test]
        fn prop_derive_ignores_key_order(
            seeds in proptest::collection::vec(any::<[u8; 32]>(), 1..6),
            salt in proptest::collection::vec(any::<u8>(), 0..16),
        ) {
            let keys: Vec<_> = seeds.iter().map(|s| Keypair::from_seed(s).public_key()).collect();
            let mut reversed = keys.clone();
            reversed.reverse();

            prop_assert_eq!(
                RendezvousId::derive(&keys, &salt, PAIRWISE_ID_LEN),
                RendezvousId::derive(&reversed, &salt, PAIRWISE_ID_LEN)
            );
        }
    }
}
