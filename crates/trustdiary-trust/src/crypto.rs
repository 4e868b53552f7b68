//! Symmetric primitives behind per-recipient sealing.
//!
//! X25519 static-static agreement feeds a BLAKE3 key derivation, and the
//! derived key drives XChaCha20-Poly1305 with a random 192-bit nonce.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use std::fmt;

use trustdiary_core::{base64_serde, X25519PublicKey, X25519SecretKey};

use crate::error::{Result, TrustError};

const KDF_CONTEXT: &str = "trustdiary 2024 sealed message key v1";

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// A shared secret derived from X25519 key agreement.
#[derive(Clone)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Agree on a shared secret between a local secret and a peer public key.
    pub fn agree(secret: &X25519SecretKey, peer_public: &X25519PublicKey) -> Self {
        Self(secret.diffie_hellman(peer_public))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive an encryption key from this shared secret.
    ///
    /// `context` binds the key to the pair of parties.
    pub fn derive_encryption_key(&self, context: &[u8]) -> EncryptionKey {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
        hasher.update(&self.0);
        hasher.update(context);
        EncryptionKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric key for XChaCha20-Poly1305.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| TrustError::Encryption(e.to_string()))?;

        cipher
            .encrypt(XNonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| TrustError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        let cipher =
            XChaCha20Poly1305::new_from_slice(&self.0).map_err(|_| TrustError::Decryption)?;

        cipher
            .decrypt(XNonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| TrustError::Decryption)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// A 192-bit nonce, fresh for every sealed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealNonce(pub [u8; NONCE_LEN]);

base64_serde!(SealNonce, NONCE_LEN);

impl SealNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_is_symmetric() {
        let alice = X25519SecretKey::generate();
        let bob = X25519SecretKey::generate();

        let a = SharedKey::agree(&alice, &bob.public_key());
        let b = SharedKey::agree(&bob, &alice.public_key());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = EncryptionKey::from_bytes([7; 32]);
        let nonce = SealNonce::generate();

        let ciphertext = key.encrypt(b"hello, world!", &nonce).unwrap();
        assert_ne!(ciphertext.as_slice(), b"hello, world!");
        assert_eq!(key.decrypt(&ciphertext, &nonce).unwrap(), b"hello, world!");
    }

    #[test]
    fn test_decrypt_wrong_nonce_fails() {
        let key = EncryptionKey::from_bytes([7; 32]);
        let ciphertext = key.encrypt(b"secret", &SealNonce::generate()).unwrap();

        assert!(matches!(
            key.decrypt(&ciphertext, &SealNonce::generate()),
            Err(TrustError::Decryption)
        ));
    }

    #[test]
    fn test_key_derivation_depends_on_context() {
        let shared = SharedKey([0x42; 32]);

        assert_eq!(
            shared.derive_encryption_key(b"a").as_bytes(),
            shared.derive_encryption_key(b"a").as_bytes()
        );
        assert_ne!(
            shared.derive_encryption_key(b"a").as_bytes(),
            shared.derive_encryption_key(b"b").as_bytes()
        );
    }

    #[test]
    fn test_nonces_are_fresh() {
        assert_ne!(SealNonce::generate(), SealNonce::generate());
    }
}
