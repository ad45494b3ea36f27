pub mod fixtures;

use async_trait::async_trait;
use bytes::Bytes;
use modelvault_core::{
    ContentHasher, IncomingFile, IngestConfig, IngestResult, RiskLevel, ScanDetails,
    SecurityScanResult,
};
use modelvault_ingest::UploadOrchestrator;
use modelvault_processing::{
    ArtifactScanner, ScanPolicy, SecurityScanner, SizePolicy, ValidationCoordinator,
};
use modelvault_storage::{
    ByteStream, EncryptedStore, MemoryStorage, Storage, StorageBackend, StorageResult,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Hasher that counts how many buffers it was asked to digest.
#[derive(Default)]
pub struct CountingHasher {
    calls: AtomicUsize,
}

impl CountingHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentHasher for CountingHasher {
    fn digest(&self, data: &[u8]) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        modelvault_core::sha256_hex(data)
    }

    fn algorithm(&self) -> &'static str {
        "sha256"
    }
}

/// Delegates to the heuristic scanner and counts invocations.
pub struct CountingScanner {
    inner: SecurityScanner,
    calls: AtomicUsize,
}

impl CountingScanner {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            inner: SecurityScanner::new(ScanPolicy::from(config)).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactScanner for CountingScanner {
    async fn scan(&self, data: Bytes, file_name: &str) -> IngestResult<SecurityScanResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(data, file_name).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Signals `entered` when a scan starts, then blocks until `release` fires.
#[derive(Default)]
pub struct GatedScanner {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl ArtifactScanner for GatedScanner {
    async fn scan(&self, _data: Bytes, _file_name: &str) -> IngestResult<SecurityScanResult> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(SecurityScanResult {
            is_safe: true,
            risk_level: RiskLevel::Low,
            threats: Vec::new(),
            scan_details: ScanDetails::default(),
            entropy: 0.0,
        })
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Backend that flips the first byte of every object it writes.
pub struct CorruptingStorage {
    pub inner: Arc<MemoryStorage>,
}

#[async_trait]
impl Storage for CorruptingStorage {
    async fn put(&self, storage_key: &str, mut data: Vec<u8>) -> StorageResult<u64> {
        if let Some(first) = data.first_mut() {
            *first ^= 0xFF;
        }
        self.inner.put(storage_key, data).await
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        self.inner.content_length(storage_key).await
    }

    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// Orchestrator over in-memory storage with instrumented hasher and scanner.
pub struct TestPipeline {
    pub orchestrator: UploadOrchestrator,
    pub storage: Arc<MemoryStorage>,
    pub hasher: Arc<CountingHasher>,
    pub scanner: Arc<CountingScanner>,
    pub spool_dir: TempDir,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_config(IngestConfig::default())
    }

    pub fn with_config(config: IngestConfig) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let hasher = Arc::new(CountingHasher::default());
        let scanner = Arc::new(CountingScanner::new(&config));

        let orchestrator = UploadOrchestrator::with_components(
            config.clone(),
            ValidationCoordinator::with_hasher(SizePolicy::from(&config), hasher.clone()),
            scanner.clone(),
            EncryptedStore::new(storage.clone()),
        );

        Self {
            orchestrator,
            storage,
            hasher,
            scanner,
            spool_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write `data` to a spool file and describe it as an upload named `name`.
    pub fn spool(&self, name: &str, data: &[u8]) -> IncomingFile {
        let path: PathBuf = self
            .spool_dir
            .path()
            .join(format!("{}.{}.upload", name, uuid_suffix()));
        std::fs::write(&path, data).unwrap();
        IncomingFile::new(path, name, data.len() as u64)
    }
}

fn uuid_suffix() -> String {
    modelvault_core::SessionId::new().to_string()
}
