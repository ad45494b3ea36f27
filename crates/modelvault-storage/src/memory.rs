use crate::keys::validate_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// In-process storage backend for tests and ephemeral deployments.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<u64> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        self.objects
            .write()
            .await
            .insert(storage_key.to_string(), Bytes::from(data));

        tracing::debug!(key = %storage_key, size_bytes = size, "Memory storage upload successful");
        Ok(size)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        validate_key(storage_key)?;
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        if self.objects.write().await.remove(storage_key).is_some() {
            tracing::debug!(key = %storage_key, "Memory storage delete successful");
        }
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self.objects.read().await.contains_key(storage_key))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        validate_key(storage_key)?;
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        validate_key(storage_key)?;
        let data = self
            .objects
            .read()
            .await
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;

        let chunks: Vec<Result<Bytes, StorageError>> = (0..data.len())
            .step_by(STREAM_CHUNK_SIZE)
            .map(|offset| {
                let end = (offset + STREAM_CHUNK_SIZE).min(data.len());
                Ok(data.slice(offset..end))
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
