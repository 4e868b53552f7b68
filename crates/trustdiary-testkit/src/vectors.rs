//! Known-answer vectors for interoperability.
//!
//! Readers and holders written elsewhere must derive the same public keys
//! from the same secrets and produce the same challenge signatures, or the
//! handshake fails. Entry signatures must cover the same canonical bytes or
//! readers drop the entries. Ed25519 signing is deterministic, so the
//! expected signatures are fixed.

use trustdiary_core::{encoding, entry, Identity, Keypair, NewEntry};
use trustdiary_sync::{ChallengeNonce, WireMessage};

/// Expected public keys for a pair of secret seeds.
#[derive(Debug, Clone)]
pub struct KeyVector {
    pub name: &'static str,
    /// Ed25519 seed.
    pub sign_seed: [u8; 32],
    /// X25519 secret scalar (before clamping).
    pub enc_secret: [u8; 32],
    /// Expected Ed25519 public key (hex).
    pub expected_sign_public_key: &'static str,
    /// Expected X25519 public key (hex).
    pub expected_enc_public_key: &'static str,
}

/// Expected response signature for a fixed challenge.
#[derive(Debug, Clone)]
pub struct ChallengeVector {
    pub name: &'static str,
    pub sign_seed: [u8; 32],
    pub challenge: [u8; 32],
    /// Expected signature as it appears in the `response` frame (base64).
    pub expected_signature: &'static str,
}

/// Expected canonical signing bytes and signature for one entry.
#[derive(Debug, Clone)]
pub struct EntryVector {
    pub name: &'static str,
    pub sign_seed: [u8; 32],
    pub title: &'static str,
    pub content: &'static str,
    pub created_at: i64,
    /// Expected CBOR map after the domain prefix (hex).
    pub expected_cbor: &'static str,
    /// Expected entry signature (base64).
    pub expected_signature: &'static str,
}

/// Get all key derivation vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "all 0x42",
            sign_seed: [0x42; 32],
            enc_secret: [0x42; 32],
            expected_sign_public_key:
                "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_enc_public_key:
                "132c442be010fbd57e72603328aa76e71fccc1503aae219327d14d9c9993f472",
        },
        KeyVector {
            name: "all zero",
            sign_seed: [0x00; 32],
            enc_secret: [0x00; 32],
            expected_sign_public_key:
                "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_enc_public_key:
                "2fe57da347cd62431528daac5fbb290730fff684afc4cfc2ed90995f58cb3b74",
        },
        KeyVector {
            name: "mixed seeds",
            sign_seed: [0x01; 32],
            enc_secret: [0x07; 32],
            expected_sign_public_key:
                "8a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c",
            expected_enc_public_key:
                "13be4feaeaf204c7fd3358fc9c00721881d174278128227ec674f37f7fe97b6d",
        },
    ]
}

/// Get all challenge signature vectors.
pub fn challenge_vectors() -> Vec<ChallengeVector> {
    vec![
        ChallengeVector {
            name: "seed 0x42 signs 0x09 challenge",
            sign_seed: [0x42; 32],
            challenge: [0x09; 32],
            expected_signature: concat!(
                "LxWsJgI3K3mR7xuBHIlJ+YjmtitRcHscIZsTpdLZ+4SrAVCj",
                "ENzsSLSnksU71II5t7SlE2xKZ0aEGV8/729+DQ==",
            ),
        },
        ChallengeVector {
            name: "seed 0x01 signs zero challenge",
            sign_seed: [0x01; 32],
            challenge: [0x00; 32],
            expected_signature: concat!(
                "NxRonlR4whEG7Z2kVVieibt3u/CfSVA/haJKWzA1BooBKRZ5",
                "+S7GkZtmA9Koh603/EgtfqmyvweZQ3BaliGMBw==",
            ),
        },
    ]
}

/// Get all entry signing vectors.
pub fn entry_vectors() -> Vec<EntryVector> {
    vec![EntryVector {
        name: "titled entry, 2023 timestamp",
        sign_seed: [0x42; 32],
        title: "Tuesday",
        content: "went to the sea",
        created_at: 1_700_000_000_000,
        expected_cbor:
            "a3006754756573646179016f77656e7420746f2074686520736561021b0000018bcfe56800",
        expected_signature: concat!(
            "AFLCPlrxQG+jFjU1w/zf8UsmK4Pr4qMVaU25FSv0mDgQ65vb",
            "lX9AV/X02liXXs/uZghIT1Z58ysy6tbDh07NAQ==",
        ),
    }]
}

/// The `response` frame a reader with `vector.sign_seed` sends for `vector.challenge`.
pub fn response_for_vector(vector: &ChallengeVector) -> WireMessage {
    let keypair = Keypair::from_seed(&vector.sign_seed);
    let challenge = ChallengeNonce(vector.challenge);
    WireMessage::Response {
        signature: keypair.sign(challenge.as_bytes()),
        public_key: keypair.public_key(),
    }
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, actual)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let keys = key_vectors().into_iter().map(|v| {
        let identity = Identity::from_seeds(v.sign_seed, v.enc_secret);
        let actual = format!(
            "{}/{}",
            identity.sign_public_key().to_hex(),
            hex::encode(identity.enc_public_key().as_bytes())
        );
        let expected = format!("{}/{}", v.expected_sign_public_key, v.expected_enc_public_key);
        (v.name.to_string(), actual == expected, actual)
    });

    let challenges = challenge_vectors().into_iter().map(|v| {
        let actual = match response_for_vector(&v) {
            WireMessage::Response { signature, .. } => encoding::encode(signature.as_bytes()),
            _ => String::new(),
        };
        (v.name.to_string(), actual == v.expected_signature, actual)
    });

    let entries = entry_vectors().into_iter().map(|v| {
        let keypair = Keypair::from_seed(&v.sign_seed);
        let cbor = entry::signing_bytes(v.title, v.content, v.created_at)
            .map(|bytes| hex::encode(&bytes[entry::ENTRY_SIGN_DOMAIN.len()..]))
            .unwrap_or_default();
        let signature = NewEntry::new(v.content)
            .title(v.title)
            .into_entry(1, "Service", v.created_at)
            .sign(&keypair)
            .ok()
            .and_then(|e| e.signature)
            .map(|sig| encoding::encode(sig.as_bytes()))
            .unwrap_or_default();

        let matches = cbor == v.expected_cbor && signature == v.expected_signature;
        (v.name.to_string(), matches, format!("{cbor}/{signature}"))
    });

    keys.chain(challenges).chain(entries).collect()
}
