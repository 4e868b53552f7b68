//! Diary entries: the immutable unit of an author's log.
//!
//! Entries are never edited or deleted. The optional signature covers a
//! canonical CBOR encoding of `(title, content, created_at)` so it does not
//! depend on how the entry was serialized for transport.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};
use crate::types::EntryId;

/// Domain separator prefixed to the signed bytes.
pub const ENTRY_SIGN_DOMAIN: &[u8] = b"trustdiary-entry-v1:";

/// Field keys of the canonical signing map.
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const TITLE: u64 = 0;
    pub const CONTENT: u64 = 1;
    pub const CREATED_AT: u64 = 2;
}

/// A single diary entry.
///
/// This is also the plaintext JSON carried inside an encrypted `entry`
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    /// Position in the author's log (1-indexed, monotonic).
    pub id: EntryId,

    #[serde(default)]
    pub title: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,

    /// Display name of the author.
    pub author: String,

    /// Creation time (Unix milliseconds).
    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Ed25519Signature>,
}

impl DiaryEntry {
    /// Bytes covered by the entry signature.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        signing_bytes(&self.title, &self.content, self.created_at)
    }

    /// Sign the entry, replacing any previous signature.
    pub fn sign(mut self, keypair: &Keypair) -> Result<Self> {
        let message = self.signing_bytes()?;
        self.signature = Some(keypair.sign(&message));
        Ok(self)
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Verify the entry signature under the author's signing key.
    pub fn verify(&self, author_key: &Ed25519PublicKey) -> Result<()> {
        let signature = self.signature.as_ref().ok_or(CoreError::MissingSignature)?;
        author_key.verify(&self.signing_bytes()?, signature)
    }

    /// Serialize to the JSON plaintext used on the wire.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse the JSON plaintext used on the wire.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// Content of an entry that has not been appended yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
}

impl NewEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Stamp the entry with its log position, author and creation time.
    pub fn into_entry(self, id: EntryId, author: impl Into<String>, created_at: i64) -> DiaryEntry {
        DiaryEntry {
            id,
            title: self.title,
            content: self.content,
            mood: self.mood,
            author: author.into(),
            created_at,
            signature: None,
        }
    }
}

/// Canonical signing bytes: `ENTRY_SIGN_DOMAIN || cbor({0: title, 1: content, 2: created_at})`.
pub fn signing_bytes(title: &str, content: &str, created_at: i64) -> Result<Vec<u8>> {
    // Entries already in key order.
    let value = Value::Map(vec![
        (Value::Integer(keys::TITLE.into()), Value::Text(title.to_string())),
        (Value::Integer(keys::CONTENT.into()), Value::Text(content.to_string())),
        (Value::Integer(keys::CREATED_AT.into()), Value::Integer(created_at.into())),
    ]);

    let mut buf = ENTRY_SIGN_DOMAIN.to_vec();
    ciborium::into_writer(&value, &mut buf)
        .map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(keypair: &Keypair) -> DiaryEntry {
        NewEntry::new("went to the sea")
            .title("Tuesday")
            .mood("calm")
            .into_entry(1, "Service", 1_700_000_000_000)
            .sign(keypair)
            .unwrap()
    }

    #[test]
    fn test_signed_entry_verifies() {
        let keypair = Keypair::generate();
        let entry = sample(&keypair);

        assert!(entry.is_signed());
        entry.verify(&keypair.public_key()).unwrap();
    }

    #[test]
    fn test_tampered_content_fails_verification() {
        let keypair = Keypair::generate();
        let mut entry = sample(&keypair);
        entry.content.push('!');

        assert!(matches!(
            entry.verify(&keypair.public_key()),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_ignores_id_and_author() {
        let keypair = Keypair::generate();
        let mut entry = sample(&keypair);
        entry.id = 7;
        entry.author = "someone else".into();

        entry.verify(&keypair.public_key()).unwrap();
    }

    #[test]
    fn test_unsigned_entry_reports_missing_signature() {
        let entry = NewEntry::new("x").into_entry(1, "a", 0);
        assert!(matches!(
            entry.verify(&Keypair::generate().public_key()),
            Err(CoreError::MissingSignature)
        ));
    }

    #[test]
    fn test_signing_bytes_are_deterministic() {
        let a = signing_bytes("t", "c", 42).unwrap();
        let b = signing_bytes("t", "c", 42).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(ENTRY_SIGN_DOMAIN));
        assert_ne!(a, signing_bytes("t", "c", 43).unwrap());
    }

    #[test]
    fn test_json_uses_camel_case_and_omits_empty_options() {
        let entry = NewEntry::new("hello").into_entry(3, "Admin", 99);
        let json: serde_json::Value = serde_json::from_slice(&entry.to_json().unwrap()).unwrap();

        assert_eq!(json["createdAt"], 99);
        assert!(json.get("mood").is_none());
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn test_json_without_title_parses() {
        let entry =
            DiaryEntry::from_json(br#"{"id":1,"content":"c","author":"a","createdAt":5}"#).unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(entry.id, 1);
    }
}
