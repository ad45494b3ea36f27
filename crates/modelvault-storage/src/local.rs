use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Artifacts stored as plain files under a root directory.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) the artifact root, e.g. `/var/lib/modelvault`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Cannot prepare artifact root {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key under the root. Traversal keys and symlinks that leave
    /// the root are rejected.
    fn resolve(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let root = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Cannot resolve artifact root: {}", e))
        })?;
        let path = self.base_path.join(storage_key);

        match path.canonicalize() {
            Ok(resolved) if !resolved.starts_with(&root) => Err(StorageError::InvalidKey(
                format!("{} escapes the artifact root", storage_key),
            )),
            _ => Ok(path),
        }
    }

    /// Temp sibling used for atomic writes. Same directory, so rename stays on one filesystem.
    fn temp_path_for(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }

    async fn require_existing(path: &Path, storage_key: &str) -> StorageResult<()> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(StorageError::NotFound(storage_key.to_string()))
        }
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp_path = Self::temp_path_for(path);

        let result = async {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(data).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to write file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to sync file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            fs::rename(&temp_path, path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to move {} into place: {}",
                    path.display(),
                    e
                ))
            })
        }
        .await;

        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %temp_path.display(),
                        error = %e,
                        "Failed to remove partial write"
                    );
                }
            }
        }

        result
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<u64> {
        let start = std::time::Instant::now();
        let path = self.resolve(storage_key)?;
        let size = data.len() as u64;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        self.write_atomic(&path, &data).await?;

        tracing::info!(
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact written to disk"
        );

        Ok(size)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let path = self.resolve(storage_key)?;
        Self::require_existing(&path, storage_key).await?;

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Cannot read artifact {}: {}", storage_key, e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact read from disk"
        );

        Ok(data)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.resolve(storage_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %storage_key, "Artifact removed from disk");
                Ok(())
            }
            // Deleting a missing artifact is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Cannot remove artifact {}: {}",
                storage_key, e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.resolve(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.resolve(storage_key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.resolve(storage_key)?;
        Self::require_existing(&path, storage_key).await?;

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Cannot open artifact {}: {}", storage_key, e))
        })?;

        let key = storage_key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |chunk| {
            chunk.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Artifact stream interrupted");
                StorageError::ReadFailed(format!("Chunk read failed: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data = b"\x89HDF\r\n\x1a\n\x00\x00\x00\x00\x00\x00".to_vec();
        let written = storage.put("models/a.h5", data.clone()).await.unwrap();
        assert_eq!(written, 14);

        let downloaded = storage.get("models/a.h5").await.unwrap();
        assert_eq!(data, downloaded);
        assert_eq!(storage.content_length("models/a.h5").await.unwrap(), 14);
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.put("models/a.pkl", vec![0x80, 0x04]).await.unwrap();
        storage.put("models/a.pkl", vec![0x80, 0x04, 0x95]).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("models"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["a.pkl".to_string()]);
        assert_eq!(storage.get("models/a.pkl").await.unwrap(), vec![0x80, 0x04, 0x95]);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.put("models/../../escape.h5", vec![1]).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(storage.delete("models/nonexistent.h5").await.is_ok());

        storage.put("models/b.onnx", vec![0x08, 0x01]).await.unwrap();
        storage.delete("models/b.onnx").await.unwrap();
        storage.delete("models/b.onnx").await.unwrap();
        assert!(!storage.exists("models/b.onnx").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.get("models/missing.h5").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.content_length("models/missing.h5").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.get_stream("models/missing.h5").await.is_err());
    }

    #[tokio::test]
    async fn test_local_storage_stream_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let data: Vec<u8> = (0..200_000).map(|i| (i % 256) as u8).collect();
        storage.put("models/large.pt", data.clone()).await.unwrap();

        let mut stream = storage.get_stream("models/large.pt").await.unwrap();
        let mut downloaded = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.unwrap();
            downloaded.extend_from_slice(&chunk);
        }

        assert_eq!(data, downloaded);
    }
}
