//! Per-artifact AES-256-GCM encryption
//!
//! Every encrypted artifact gets its own random key and nonce. The on-disk layout
//! is `nonce (12 bytes) || ciphertext || tag (16 bytes)`. Keys are handed back to
//! the caller base64-encoded and never persisted by the store.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use std::fmt;

use crate::error::{IngestError, IngestResult};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// 256-bit artifact key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        EncryptionKey(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> IngestResult<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            IngestError::InvalidEncryptionKey(format!(
                "Encryption key must be {} bytes (256 bits), got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(EncryptionKey(bytes))
    }

    pub fn from_base64(encoded: &str) -> IngestResult<Self> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| {
                IngestError::InvalidEncryptionKey(format!("Failed to decode encryption key: {}", e))
            })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

/// AES-256-GCM cipher bound to one artifact key.
#[derive(Clone)]
pub struct FileCipher {
    cipher: Aes256Gcm,
}

impl FileCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(&key.0);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt with a fresh nonce, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> IngestResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| IngestError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    /// Decrypt `nonce || ciphertext || tag`. Any tampering fails closed.
    pub fn decrypt(&self, combined: &[u8]) -> IngestResult<Vec<u8>> {
        if combined.len() < NONCE_LEN + TAG_LEN {
            return Err(IngestError::DecryptionFailed);
        }

        let nonce = Nonce::from_slice(&combined[..NONCE_LEN]);
        self.cipher
            .decrypt(nonce, &combined[NONCE_LEN..])
            .map_err(|_| IngestError::DecryptionFailed)
    }
}
