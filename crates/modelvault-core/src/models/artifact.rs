use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of a model written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub storage_path: String,
    /// Hex SHA-256 of the plaintext.
    pub checksum: String,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Bytes on disk. Includes nonce and tag when encrypted.
    pub stored_size: u64,
    /// Base64 AES-256 key. Present only when encrypted; the store keeps no copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl StoredArtifact {
    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }
}
