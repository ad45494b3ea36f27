//! Upload orchestration: validate → scan → store.
//!
//! Each ingestion runs as a session with states `pending → processing →
//! (completed | failed | cancelled)`. Stages never reorder. Cancellation is
//! cooperative and observed at stage boundaries; once storage has begun the
//! session can no longer be cancelled. Failures abort the remaining stages,
//! clean up the spooled upload and surface a classified [`UploadErrorDetails`].

use bytes::{Bytes, BytesMut};
use modelvault_core::{
    ErrorMetadata, FileValidationResult, IncomingFile, IngestConfig, IngestError, IngestResult,
    IngestionOutcome, LogLevel, PipelineStage, SecurityScanResult, SessionId, StoredArtifact,
    UploadErrorDetails, UploadOptions, UploadSession, UploadStatus,
};
use modelvault_processing::{
    ArtifactScanner, ScanPolicy, SecurityScanner, SizePolicy, ValidationCoordinator,
};
use modelvault_storage::{create_storage, EncryptedStore, Storage};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::cleanup::{remove_temp_file, SessionSweeper};
use crate::events::{SessionEvent, SessionEventKind};
use crate::registry::{SessionHandle, SessionRegistry, TrackedSession};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Failed ingestion, carrying the session it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("Upload session {session_id} failed: {error}")]
pub struct IngestFailure {
    pub session_id: SessionId,
    #[source]
    pub error: IngestError,
}

impl IngestFailure {
    /// User-safe classification of the failure.
    pub fn details(&self) -> UploadErrorDetails {
        self.error.to_details()
    }
}

pub struct UploadOrchestrator {
    config: IngestConfig,
    validator: ValidationCoordinator,
    scanner: Arc<dyn ArtifactScanner>,
    store: EncryptedStore,
    registry: Arc<SessionRegistry>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl UploadOrchestrator {
    /// Build the default pipeline (heuristic scanner, SHA-256 hasher) over `storage`.
    pub fn new(config: IngestConfig, storage: Arc<dyn Storage>) -> IngestResult<Self> {
        let validator = ValidationCoordinator::new(SizePolicy::from(&config));
        let scanner = Arc::new(SecurityScanner::new(ScanPolicy::from(&config))?);
        Ok(Self::with_components(
            config,
            validator,
            scanner,
            EncryptedStore::new(storage),
        ))
    }

    pub fn with_components(
        config: IngestConfig,
        validator: ValidationCoordinator,
        scanner: Arc<dyn ArtifactScanner>,
        store: EncryptedStore,
    ) -> Self {
        Self {
            config,
            validator,
            scanner,
            store,
            registry: Arc::new(SessionRegistry::new()),
            events: None,
        }
    }

    /// Build the pipeline with the storage backend selected by `config`.
    pub async fn from_config(config: IngestConfig) -> anyhow::Result<Self> {
        let storage = create_storage(&config).await?;
        Ok(Self::new(config, storage)?)
    }

    /// Send a [`SessionEvent`] for every transition and progress update.
    pub fn with_event_sink(mut self, sender: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Validate, scan and store `file` in a fresh session.
    pub async fn ingest(
        &self,
        file: IncomingFile,
        options: UploadOptions,
    ) -> Result<IngestionOutcome, IngestFailure> {
        let session_id = self.start_session(&file).await;
        self.run(session_id, file, options).await
    }

    /// Register a pending session for `file` without starting it.
    pub async fn start_session(&self, file: &IncomingFile) -> SessionId {
        let session = UploadSession::new(file.original_name.clone(), file.declared_size);
        let session_id = session.id;
        self.emit(SessionEventKind::Created, &session);
        self.registry.insert(session).await;

        tracing::info!(
            session_id = %session_id,
            file_name = %file.original_name,
            declared_size = file.declared_size,
            "Upload session created"
        );
        session_id
    }

    /// Drive a pending session through the pipeline.
    #[tracing::instrument(skip(self, file, options), fields(session_id = %session_id, file_name = %file.original_name))]
    pub async fn run(
        &self,
        session_id: SessionId,
        file: IncomingFile,
        options: UploadOptions,
    ) -> Result<IngestionOutcome, IngestFailure> {
        let start = Instant::now();

        let Some(handle) = self.registry.get(&session_id).await else {
            return Err(IngestFailure {
                session_id,
                error: IngestError::SessionNotFound(session_id),
            });
        };

        match self.execute(&handle, session_id, &file, &options).await {
            Ok(outcome) => {
                tracing::info!(
                    storage_path = %outcome.stored_artifact.storage_path,
                    size_bytes = outcome.stored_artifact.size,
                    encrypted = outcome.stored_artifact.is_encrypted(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Upload completed"
                );
                Ok(outcome)
            }
            Err(error) => {
                self.handle_failure(&handle, &file, &error).await;
                Err(IngestFailure { session_id, error })
            }
        }
    }

    async fn execute(
        &self,
        handle: &SessionHandle,
        session_id: SessionId,
        file: &IncomingFile,
        options: &UploadOptions,
    ) -> IngestResult<IngestionOutcome> {
        self.begin(handle).await?;

        let data = self
            .with_timeout(PipelineStage::Upload, self.read_upload(handle, file))
            .await?;

        self.enter_stage(handle, PipelineStage::Validation).await?;
        let validation = self
            .with_timeout(PipelineStage::Validation, self.validate(data.clone(), file))
            .await?;

        let scan = if options.require_security_scan || self.config.require_security_scan {
            self.enter_stage(handle, PipelineStage::Processing).await?;
            Some(
                self.with_timeout(PipelineStage::Processing, self.scan(data.clone(), file))
                    .await?,
            )
        } else {
            tracing::warn!("Security scan skipped for this upload");
            None
        };

        self.commit(handle).await?;
        let stored_artifact = self
            .with_timeout(
                PipelineStage::Storage,
                self.store
                    .store_from_temp(&file.path, data.into(), &file.original_name, options),
            )
            .await?;

        if let Err(e) = self.finish(handle, &validation, &stored_artifact).await {
            if let Err(cleanup_err) = self.store.delete(&stored_artifact.storage_path).await {
                tracing::warn!(
                    error = %cleanup_err,
                    key = %stored_artifact.storage_path,
                    "Failed to remove artifact of failed upload"
                );
            }
            return Err(e);
        }

        Ok(IngestionOutcome {
            session_id,
            stored_artifact,
            validation,
            scan,
        })
    }

    /// `pending → processing`, unless the caller cancelled first.
    async fn begin(&self, handle: &SessionHandle) -> IngestResult<()> {
        let mut tracked = handle.lock().await;
        if tracked.session.status == UploadStatus::Cancelled {
            return Err(IngestError::Cancelled {
                stage: PipelineStage::Upload,
            });
        }
        tracked.session.transition(UploadStatus::Processing)?;
        tracked.session.stage = Some(PipelineStage::Upload);
        self.emit(SessionEventKind::StatusChanged, &tracked.session);
        Ok(())
    }

    /// Stage boundary: observe cancellation, then record the new stage.
    async fn enter_stage(&self, handle: &SessionHandle, stage: PipelineStage) -> IngestResult<()> {
        let mut tracked = handle.lock().await;
        observe_boundary(&mut tracked, stage)
    }

    /// Last cancellation point. From here on cancel requests are refused.
    /// The check and the `committing` flag happen under one lock.
    async fn commit(&self, handle: &SessionHandle) -> IngestResult<()> {
        let mut tracked = handle.lock().await;
        observe_boundary(&mut tracked, PipelineStage::Storage)?;
        tracked.committing = true;
        Ok(())
    }

    /// Re-read the stored artifact and compare it with the validation digest
    /// before the session is marked completed.
    async fn finish(
        &self,
        handle: &SessionHandle,
        validation: &FileValidationResult,
        artifact: &StoredArtifact,
    ) -> IngestResult<()> {
        let expected = validation
            .checksum
            .as_deref()
            .unwrap_or(&artifact.checksum);
        self.with_timeout(
            PipelineStage::Storage,
            self.store.verify(
                &artifact.storage_path,
                artifact.encryption_key.as_deref(),
                expected,
            ),
        )
        .await?;

        let mut tracked = handle.lock().await;
        tracked.session.transition(UploadStatus::Completed)?;
        self.emit(SessionEventKind::StatusChanged, &tracked.session);
        Ok(())
    }

    /// Read the spooled upload in chunks, updating progress as bytes arrive.
    /// The size policy is applied to the on-disk size before anything is read.
    async fn read_upload(&self, handle: &SessionHandle, file: &IncomingFile) -> IngestResult<Bytes> {
        let metadata = tokio::fs::metadata(&file.path).await.map_err(|e| {
            IngestError::UploadFailed(format!("Failed to stat {}: {}", file.path.display(), e))
        })?;
        let size = metadata.len();

        self.validator.check_size(size)?;

        let mut reader = tokio::fs::File::open(&file.path).await.map_err(|e| {
            IngestError::UploadFailed(format!("Failed to open {}: {}", file.path.display(), e))
        })?;

        let mut data = BytesMut::with_capacity(size as usize);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            self.record_progress(handle, data.len() as u64).await;
        }

        Ok(data.freeze())
    }

    async fn record_progress(&self, handle: &SessionHandle, uploaded_bytes: u64) {
        let mut tracked = handle.lock().await;
        let eta = tracked.progress.record(uploaded_bytes);
        tracked.session.uploaded_bytes = uploaded_bytes;
        tracked.session.estimated_time_remaining = eta;
        tracked.session.updated_at = chrono::Utc::now();
        self.emit(SessionEventKind::Progress, &tracked.session);
    }

    async fn validate(&self, data: Bytes, file: &IncomingFile) -> IngestResult<FileValidationResult> {
        let result = self.validator.validate_bytes(data, &file.original_name).await?;
        if let Some(error) = self.validator.rejection(&result) {
            return Err(error);
        }
        for warning in &result.warnings {
            tracing::warn!(warning = %warning, "Validation warning");
        }
        Ok(result)
    }

    async fn scan(&self, data: Bytes, file: &IncomingFile) -> IngestResult<SecurityScanResult> {
        let result = self.scanner.scan(data, &file.original_name).await?;
        if !result.is_safe {
            return Err(IngestError::UnsafeContent {
                risk_level: result.risk_level,
                threats: result.threats,
            });
        }
        Ok(result)
    }

    async fn with_timeout<T>(
        &self,
        stage: PipelineStage,
        fut: impl Future<Output = IngestResult<T>>,
    ) -> IngestResult<T> {
        let limit = self.config.stage_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Timeout {
                stage,
                seconds: limit.as_secs(),
            }),
        }
    }

    /// Record the failure on the session and clean up. Cleanup errors are logged only.
    async fn handle_failure(&self, handle: &SessionHandle, file: &IncomingFile, error: &IngestError) {
        {
            let mut tracked = handle.lock().await;
            match tracked.session.status {
                UploadStatus::Cancelled => {}
                UploadStatus::Pending | UploadStatus::Processing => {
                    if tracked.session.status == UploadStatus::Pending {
                        let _ = tracked.session.transition(UploadStatus::Processing);
                    }
                    if let Err(e) = tracked.session.fail(error.to_details()) {
                        tracing::error!(error = %e, "Failed to mark session as failed");
                    }
                    self.emit(SessionEventKind::StatusChanged, &tracked.session);
                }
                UploadStatus::Completed | UploadStatus::Failed => {}
            }
        }

        match error.log_level() {
            LogLevel::Debug => tracing::debug!(
                error = %error,
                error_type = error.error_type(),
                stage = %error.stage(),
                "Upload rejected"
            ),
            LogLevel::Warn => tracing::warn!(
                error = %error,
                error_type = error.error_type(),
                stage = %error.stage(),
                "Upload rejected"
            ),
            LogLevel::Error => tracing::error!(
                error = %error,
                error_type = error.error_type(),
                stage = %error.stage(),
                "Upload failed"
            ),
        }

        remove_temp_file(&file.path).await;
    }

    /// Current state of a session.
    pub async fn get_progress(&self, session_id: SessionId) -> IngestResult<UploadSession> {
        self.registry
            .snapshot(&session_id)
            .await
            .ok_or(IngestError::SessionNotFound(session_id))
    }

    /// Request cancellation. Refused for terminal sessions and once storage has begun.
    pub async fn cancel(&self, session_id: SessionId) -> IngestResult<UploadSession> {
        let handle = self
            .registry
            .get(&session_id)
            .await
            .ok_or(IngestError::SessionNotFound(session_id))?;

        let mut tracked = handle.lock().await;
        if tracked.committing && !tracked.session.is_terminal() {
            return Err(IngestError::CancellationTooLate(session_id));
        }
        tracked.session.transition(UploadStatus::Cancelled)?;
        self.emit(SessionEventKind::StatusChanged, &tracked.session);

        tracing::info!(
            session_id = %session_id,
            stage = ?tracked.session.stage,
            "Upload session cancelled"
        );
        Ok(tracked.session.clone())
    }

    /// Stop tracking a session.
    pub async fn remove_session(&self, session_id: SessionId) -> IngestResult<UploadSession> {
        self.registry
            .remove(&session_id)
            .await
            .ok_or(IngestError::SessionNotFound(session_id))
    }

    /// Sessions still pending or processing.
    pub async fn active_sessions(&self) -> Vec<UploadSession> {
        self.registry.active().await
    }

    pub async fn sweep_expired_sessions(&self) -> usize {
        self.registry
            .sweep_expired(self.config.session_retention(), chrono::Utc::now())
            .await
    }

    /// Spawn the periodic retention sweep. `None` when the sweep interval is 0.
    pub fn start_retention_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self.config.session_sweep_interval_secs == 0 {
            return None;
        }
        let sweeper = SessionSweeper::new(
            self.registry.clone(),
            self.config.session_retention(),
            Duration::from_secs(self.config.session_sweep_interval_secs),
        );
        Some(Arc::new(sweeper).start())
    }

    pub async fn retrieve_file(
        &self,
        storage_path: &str,
        encryption_key: Option<&str>,
    ) -> IngestResult<Vec<u8>> {
        self.store.retrieve(storage_path, encryption_key).await
    }

    pub async fn delete_file(&self, storage_path: &str) -> IngestResult<()> {
        self.store.delete(storage_path).await
    }

    fn emit(&self, kind: SessionEventKind, session: &UploadSession) {
        if let Some(sender) = &self.events {
            if sender.send(SessionEvent::from_session(kind, session)).is_err() {
                tracing::debug!(session_id = %session.id, "Session event receiver dropped");
            }
        }
    }
}

fn observe_boundary(tracked: &mut TrackedSession, stage: PipelineStage) -> IngestResult<()> {
    if tracked.session.status == UploadStatus::Cancelled {
        tracing::info!(stage = %stage, "Cancellation observed at stage boundary");
        return Err(IngestError::Cancelled { stage });
    }
    tracked.session.stage = Some(stage);
    tracked.session.updated_at = chrono::Utc::now();
    tracing::debug!(stage = %stage, "Entering pipeline stage");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelvault_core::{ErrorCode, RiskLevel};
    use modelvault_storage::MemoryStorage;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    const HDF5_14: &[u8] = b"\x89HDF\r\n\x1a\n\x00\x00\x00\x00\x00\x00";

    fn orchestrator() -> UploadOrchestrator {
        UploadOrchestrator::new(IngestConfig::default(), Arc::new(MemoryStorage::new())).unwrap()
    }

    async fn spool(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> IncomingFile {
        let path = dir.path().join(format!("{}.upload", name));
        tokio::fs::write(&path, data).await.unwrap();
        IncomingFile::new(path, name, data.len() as u64)
    }

    #[tokio::test]
    async fn test_ingest_small_hdf5() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator();
        let file = spool(&dir, "model.h5", HDF5_14).await;
        let temp_path = file.path.clone();

        let outcome = orchestrator
            .ingest(file, UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.validation.format, Some(modelvault_core::ModelFormat::Keras));
        assert!(outcome.scan.as_ref().unwrap().is_safe);
        assert_eq!(
            outcome.stored_artifact.checksum,
            modelvault_core::sha256_hex(HDF5_14)
        );
        assert!(!temp_path.exists());

        let session = orchestrator.get_progress(outcome.session_id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Completed);
        assert_eq!(session.uploaded_bytes, 14);
        assert!(session.error.is_none());
    }

    struct FlaggingScanner;

    #[async_trait::async_trait]
    impl ArtifactScanner for FlaggingScanner {
        async fn scan(&self, data: Bytes, _file_name: &str) -> IngestResult<SecurityScanResult> {
            Ok(SecurityScanResult {
                is_safe: false,
                risk_level: RiskLevel::High,
                threats: vec!["Executable signature detected (PE)".to_string()],
                scan_details: modelvault_core::ScanDetails {
                    has_executable_content: true,
                    ..Default::default()
                },
                entropy: modelvault_processing::scanner::shannon_entropy(&data),
            })
        }

        fn name(&self) -> &'static str {
            "flagging"
        }
    }

    #[tokio::test]
    async fn test_unsafe_upload_is_not_stored() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(MemoryStorage::new());
        let config = IngestConfig::default();
        let orchestrator = UploadOrchestrator::with_components(
            config.clone(),
            ValidationCoordinator::new(SizePolicy::from(&config)),
            Arc::new(FlaggingScanner),
            EncryptedStore::new(storage.clone()),
        );
        let file = spool(&dir, "model.h5", HDF5_14).await;
        let temp_path = file.path.clone();

        let failure = orchestrator
            .ingest(file, UploadOptions::default())
            .await
            .unwrap_err();

        let details = failure.details();
        assert_eq!(details.code, ErrorCode::SecurityError);
        assert_eq!(details.stage, PipelineStage::Processing);
        assert!(details.message.contains("PE"));
        assert!(storage.is_empty().await);
        assert!(!temp_path.exists());
    }

    struct StalledScanner;

    #[async_trait::async_trait]
    impl ArtifactScanner for StalledScanner {
        async fn scan(&self, _data: Bytes, _file_name: &str) -> IngestResult<SecurityScanResult> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(IngestError::ScanFailed("unreachable".to_string()))
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_stalled_stage_times_out() {
        let dir = tempdir().unwrap();
        let config = IngestConfig {
            stage_timeout_secs: 1,
            ..IngestConfig::default()
        };
        let orchestrator = UploadOrchestrator::with_components(
            config.clone(),
            ValidationCoordinator::new(SizePolicy::from(&config)),
            Arc::new(StalledScanner),
            EncryptedStore::new(Arc::new(MemoryStorage::new())),
        );
        let file = spool(&dir, "model.h5", HDF5_14).await;

        let failure = orchestrator
            .ingest(file, UploadOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            IngestError::Timeout {
                stage: PipelineStage::Processing,
                seconds: 1
            }
        ));
        let details = failure.details();
        assert_eq!(details.code, ErrorCode::TimeoutError);
        assert_eq!(details.stage, PipelineStage::Processing);
    }

    #[tokio::test]
    async fn test_pe_upload_is_rejected() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator();
        let mut pe = b"MZ\x90\x00".to_vec();
        pe.extend_from_slice(&[0u8; 124]);
        let file = spool(&dir, "model.pt", &pe).await;

        let failure = orchestrator
            .ingest(file, UploadOptions::default())
            .await
            .unwrap_err();

        // MZ matches no model signature, so validation rejects it before the scan.
        assert_eq!(failure.details().code, ErrorCode::ValidationError);
        let session = orchestrator.get_progress(failure.session_id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let dir = tempdir().unwrap();
        let orchestrator = orchestrator();
        let file = spool(&dir, "model.h5", HDF5_14).await;
        let temp_path = file.path.clone();

        let session_id = orchestrator.start_session(&file).await;
        let cancelled = orchestrator.cancel(session_id).await.unwrap();
        assert_eq!(cancelled.status, UploadStatus::Cancelled);

        let failure = orchestrator
            .run(session_id, file, UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(failure.details().code, ErrorCode::Cancelled);
        assert!(!temp_path.exists());

        let session = orchestrator.get_progress(session_id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_during_commit_is_refused() {
        let orchestrator = orchestrator();
        let file = IncomingFile::new("/nonexistent", "model.h5", 14);
        let session_id = orchestrator.start_session(&file).await;

        let handle = orchestrator.registry().get(&session_id).await.unwrap();
        orchestrator.begin(&handle).await.unwrap();
        orchestrator.commit(&handle).await.unwrap();

        let err = orchestrator.cancel(session_id).await.unwrap_err();
        assert!(matches!(err, IngestError::CancellationTooLate(_)));
        let session = orchestrator.get_progress(session_id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Processing);
        assert_eq!(session.stage, Some(PipelineStage::Storage));
    }

    #[tokio::test]
    async fn test_cancel_queued_behind_commit_is_refused() {
        let orchestrator = Arc::new(orchestrator());
        let file = IncomingFile::new("/nonexistent", "model.h5", 14);
        let session_id = orchestrator.start_session(&file).await;

        let handle = orchestrator.registry().get(&session_id).await.unwrap();
        orchestrator.begin(&handle).await.unwrap();

        // Hold the session so commit and cancel queue up on it in that order.
        let guard = handle.lock().await;
        let commit = tokio::spawn({
            let orchestrator = orchestrator.clone();
            let handle = handle.clone();
            async move { orchestrator.commit(&handle).await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        let cancel = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.cancel(session_id).await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        drop(guard);

        commit.await.unwrap().unwrap();
        let err = cancel.await.unwrap().unwrap_err();
        assert!(matches!(err, IngestError::CancellationTooLate(_)));

        let tracked = handle.lock().await;
        assert!(tracked.committing);
        assert_eq!(tracked.session.status, UploadStatus::Processing);
        assert_eq!(tracked.session.stage, Some(PipelineStage::Storage));
    }

    #[tokio::test]
    async fn test_events_follow_transitions() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orchestrator = orchestrator().with_event_sink(tx);
        let file = spool(&dir, "model.h5", HDF5_14).await;

        orchestrator.ingest(file, UploadOptions::default()).await.unwrap();
        drop(orchestrator);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.first().unwrap().kind, SessionEventKind::Created);
        assert!(events.iter().any(|e| e.kind == SessionEventKind::Progress));
        let last = events.last().unwrap();
        assert_eq!(last.kind, SessionEventKind::StatusChanged);
        assert_eq!(last.status, UploadStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_temp_file_is_upload_error() {
        let orchestrator = orchestrator();
        let file = IncomingFile::new("/nonexistent/upload.tmp", "model.h5", 14);
        let failure = orchestrator
            .ingest(file, UploadOptions::default())
            .await
            .unwrap_err();
        let details = failure.details();
        assert_eq!(details.code, ErrorCode::StorageError);
        assert_eq!(details.stage, PipelineStage::Upload);
        assert!(!details.message.contains("/nonexistent"));

        let session = orchestrator.get_progress(failure.session_id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Failed);
        assert_eq!(session.error, Some(details));
    }

    #[tokio::test]
    async fn test_scan_skipped_when_disabled() {
        let dir = tempdir().unwrap();
        let config = IngestConfig {
            require_security_scan: false,
            ..IngestConfig::default()
        };
        let orchestrator =
            UploadOrchestrator::new(config, Arc::new(MemoryStorage::new())).unwrap();
        let file = spool(&dir, "model.h5", HDF5_14).await;
        let options = UploadOptions {
            require_security_scan: false,
            ..UploadOptions::default()
        };

        let outcome = orchestrator.ingest(file, options).await.unwrap();
        assert!(outcome.scan.is_none());
    }
}
