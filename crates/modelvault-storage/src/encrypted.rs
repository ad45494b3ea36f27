//! Encrypted artifact store
//!
//! Writes model artifacts to a [`Storage`] backend under content-addressed keys,
//! optionally sealed with a fresh AES-256-GCM key per artifact. The key is returned
//! to the caller and never retained here.

use chrono::Utc;
use modelvault_core::checksum::{digests_match, sha256_hex};
use modelvault_core::{
    EncryptionKey, FileCipher, IngestError, IngestResult, PipelineStage, StoredArtifact,
    UploadOptions,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::keys::generate_model_key;
use crate::traits::{ByteStream, Storage};

#[derive(Clone)]
pub struct EncryptedStore {
    storage: Arc<dyn Storage>,
}

impl EncryptedStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Persist `data` and return its metadata.
    ///
    /// The original name only contributes a sanitized extension to the key.
    #[tracing::instrument(skip(self, data, options), fields(size_bytes = data.len(), encrypt = options.encrypt))]
    pub async fn store(
        &self,
        data: Vec<u8>,
        original_name: &str,
        options: &UploadOptions,
    ) -> IngestResult<StoredArtifact> {
        let start = Instant::now();
        let storage_key = generate_model_key(options.user_id, original_name);
        let size = data.len() as u64;
        let encrypt = options.encrypt;

        let (checksum, payload, key) = tokio::task::spawn_blocking(move || {
            let checksum = sha256_hex(&data);
            if !encrypt {
                return Ok::<_, IngestError>((checksum, data, None));
            }
            let key = EncryptionKey::generate();
            let sealed = FileCipher::new(&key).encrypt(&data)?;
            Ok((checksum, sealed, Some(key)))
        })
        .await
        .map_err(|e| IngestError::Internal {
            stage: PipelineStage::Storage,
            message: format!("Encryption task failed: {}", e),
        })??;

        let stored_size = self.storage.put(&storage_key, payload).await?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            stored_size_bytes = stored_size,
            encrypted = key.is_some(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Model artifact stored"
        );

        Ok(StoredArtifact {
            storage_path: storage_key,
            checksum,
            size,
            stored_size,
            encryption_key: key.map(|k| k.to_base64()),
            stored_at: Utc::now(),
        })
    }

    /// Store `data` and then remove the spooled upload at `temp_path`.
    ///
    /// The temp file is removed only once the artifact write has succeeded.
    /// A failed removal is logged and does not fail the store.
    pub async fn store_from_temp(
        &self,
        temp_path: &Path,
        data: Vec<u8>,
        original_name: &str,
        options: &UploadOptions,
    ) -> IngestResult<StoredArtifact> {
        let artifact = self.store(data, original_name, options).await?;

        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %temp_path.display(),
                    key = %artifact.storage_path,
                    error = %e,
                    "Failed to remove temp upload after storing artifact"
                );
            }
        }

        Ok(artifact)
    }

    /// Read an artifact back, decrypting it when a key is supplied.
    pub async fn retrieve(
        &self,
        storage_path: &str,
        encryption_key: Option<&str>,
    ) -> IngestResult<Vec<u8>> {
        let data = self.storage.get(storage_path).await?;

        let Some(encoded) = encryption_key else {
            return Ok(data);
        };

        let key = EncryptionKey::from_base64(encoded)?;
        let plaintext = tokio::task::spawn_blocking(move || FileCipher::new(&key).decrypt(&data))
            .await
            .map_err(|e| IngestError::Internal {
                stage: PipelineStage::Storage,
                message: format!("Decryption task failed: {}", e),
            })?;

        if plaintext.is_err() {
            tracing::warn!(key = %storage_path, "Artifact decryption failed");
        }
        plaintext
    }

    /// Stream an unencrypted artifact in chunks.
    pub async fn retrieve_stream(&self, storage_path: &str) -> IngestResult<ByteStream> {
        Ok(self.storage.get_stream(storage_path).await?)
    }

    /// Delete an artifact. Missing artifacts are not an error.
    pub async fn delete(&self, storage_path: &str) -> IngestResult<()> {
        self.storage.delete(storage_path).await?;
        tracing::info!(key = %storage_path, "Model artifact deleted");
        Ok(())
    }

    /// Re-hash the stored plaintext and compare it with `expected_checksum`.
    pub async fn verify(
        &self,
        storage_path: &str,
        encryption_key: Option<&str>,
        expected_checksum: &str,
    ) -> IngestResult<()> {
        let plaintext = self.retrieve(storage_path, encryption_key).await?;
        let actual = tokio::task::spawn_blocking(move || sha256_hex(&plaintext))
            .await
            .map_err(|e| IngestError::Internal {
                stage: PipelineStage::Storage,
                message: format!("Checksum task failed: {}", e),
            })?;

        if !digests_match(&actual, expected_checksum) {
            tracing::error!(
                key = %storage_path,
                expected = %expected_checksum,
                actual = %actual,
                "Stored artifact failed integrity check"
            );
            return Err(IngestError::IntegrityMismatch {
                expected: expected_checksum.to_string(),
                actual,
            });
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "storage-memory", feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::{LocalStorage, MemoryStorage};
    use futures::StreamExt;
    use modelvault_core::encryption::{NONCE_LEN, TAG_LEN};
    use tempfile::tempdir;
    use uuid::Uuid;

    const HDF5: &[u8] = b"\x89HDF\r\n\x1a\n\x00\x00\x00\x00\x00\x00";

    fn memory_store() -> (EncryptedStore, Arc<MemoryStorage>) {
        let backend = Arc::new(MemoryStorage::new());
        (EncryptedStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_store_plaintext() {
        let (store, backend) = memory_store();
        let artifact = store
            .store(HDF5.to_vec(), "classifier.h5", &UploadOptions::default())
            .await
            .unwrap();

        assert!(artifact.storage_path.starts_with("models/"));
        assert!(artifact.storage_path.ends_with(".h5"));
        assert!(!artifact.storage_path.contains("classifier"));
        assert_eq!(artifact.checksum, sha256_hex(HDF5));
        assert_eq!(artifact.size, 14);
        assert_eq!(artifact.stored_size, 14);
        assert!(artifact.encryption_key.is_none());
        assert_eq!(backend.get(&artifact.storage_path).await.unwrap(), HDF5);
    }

    #[tokio::test]
    async fn test_store_encrypted_round_trip() {
        let (store, backend) = memory_store();
        let options = UploadOptions {
            encrypt: true,
            ..UploadOptions::default()
        };

        let artifact = store.store(HDF5.to_vec(), "m.h5", &options).await.unwrap();
        let key = artifact.encryption_key.clone().unwrap();
        assert_eq!(artifact.stored_size, (14 + NONCE_LEN + TAG_LEN) as u64);
        assert_ne!(backend.get(&artifact.storage_path).await.unwrap(), HDF5);

        let plaintext = store
            .retrieve(&artifact.storage_path, Some(&key))
            .await
            .unwrap();
        assert_eq!(plaintext, HDF5);

        store
            .verify(&artifact.storage_path, Some(&key), &artifact.checksum)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_owner_scoped_key() {
        let (store, _) = memory_store();
        let owner = Uuid::new_v4();
        let options = UploadOptions {
            user_id: Some(owner),
            ..UploadOptions::default()
        };
        let artifact = store.store(vec![0x80, 0x04], "a.pkl", &options).await.unwrap();
        assert!(artifact
            .storage_path
            .starts_with(&format!("models/{}/", owner)));
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_is_fatal() {
        let (store, backend) = memory_store();
        let options = UploadOptions {
            encrypt: true,
            ..UploadOptions::default()
        };
        let artifact = store.store(HDF5.to_vec(), "m.h5", &options).await.unwrap();

        let mut sealed = backend.get(&artifact.storage_path).await.unwrap();
        sealed[NONCE_LEN] ^= 0xff;
        backend.put(&artifact.storage_path, sealed).await.unwrap();

        let err = store
            .retrieve(&artifact.storage_path, artifact.encryption_key.as_deref())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::DecryptionFailed));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_verify_detects_mismatch() {
        let (store, backend) = memory_store();
        let artifact = store
            .store(HDF5.to_vec(), "m.h5", &UploadOptions::default())
            .await
            .unwrap();

        backend
            .put(&artifact.storage_path, b"corrupted".to_vec())
            .await
            .unwrap();

        let err = store
            .verify(&artifact.storage_path, None, &artifact.checksum)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::IntegrityMismatch { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, backend) = memory_store();
        let artifact = store
            .store(HDF5.to_vec(), "m.h5", &UploadOptions::default())
            .await
            .unwrap();

        store.delete(&artifact.storage_path).await.unwrap();
        store.delete(&artifact.storage_path).await.unwrap();
        assert!(!backend.exists(&artifact.storage_path).await.unwrap());
        assert!(matches!(
            store.retrieve(&artifact.storage_path, None).await,
            Err(IngestError::ArtifactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_from_temp_removes_temp_after_write() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(LocalStorage::new(dir.path().join("store")).await.unwrap());
        let store = EncryptedStore::new(backend);

        let temp_path = dir.path().join("upload.tmp");
        tokio::fs::write(&temp_path, HDF5).await.unwrap();

        let artifact = store
            .store_from_temp(&temp_path, HDF5.to_vec(), "m.h5", &UploadOptions::default())
            .await
            .unwrap();

        assert!(!temp_path.exists());
        assert!(dir.path().join("store").join(&artifact.storage_path).exists());

        let mut stream = store.retrieve_stream(&artifact.storage_path).await.unwrap();
        let mut streamed = Vec::new();
        while let Some(chunk) = stream.next().await {
            streamed.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(streamed, HDF5);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let (store, _) = memory_store();
        let artifact = store
            .store(HDF5.to_vec(), "m.h5", &UploadOptions::default())
            .await
            .unwrap();
        assert!(matches!(
            store.retrieve(&artifact.storage_path, Some("bm90LWEta2V5")).await,
            Err(IngestError::InvalidEncryptionKey(_))
        ));
    }
}
