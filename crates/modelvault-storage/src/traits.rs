//! Backend-neutral artifact storage

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use modelvault_core::IngestError;
use std::pin::Pin;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact write failed: {0}")]
    WriteFailed(String),

    #[error("Artifact read failed: {0}")]
    ReadFailed(String),

    #[error("Artifact removal failed: {0}")]
    DeleteFailed(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage misconfigured: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Artifact contents delivered in chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => IngestError::ArtifactNotFound(key),
            other => IngestError::StorageFailed(other.to_string()),
        }
    }
}

/// Key/value store for artifact bytes.
///
/// Implemented by the filesystem and in-memory backends. Writes are atomic: a
/// reader never observes a partially written object.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key`, replacing any previous object.
    /// Returns the number of bytes written.
    async fn put(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<u64>;

    /// Read a whole object
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Stored size in bytes. `NotFound` for missing objects.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Read an object in chunks without buffering it whole.
    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    fn backend_type(&self) -> StorageBackend;
}
