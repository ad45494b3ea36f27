use bytes::Bytes;
use modelvault_core::{
    ContentHasher, FileValidationResult, IngestConfig, IngestError, IngestResult, ModelFormat,
    PipelineStage, Sha256Hasher,
};
use std::path::Path;
use std::sync::Arc;

use crate::sniffer::{extension_of, sniff};

const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
const DEFAULT_SMALL_FILE_WARNING: u64 = 100;

/// Size limits applied before any content is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    pub max_file_size: u64,
    pub small_file_warning: u64,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            small_file_warning: DEFAULT_SMALL_FILE_WARNING,
        }
    }
}

impl From<&IngestConfig> for SizePolicy {
    fn from(config: &IngestConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes,
            small_file_warning: config.small_file_warning_bytes,
        }
    }
}

/// Model file validator
///
/// Runs the size policy, format sniffing and content hashing, in that order.
/// The size check short-circuits: rejected files are never read or hashed.
#[derive(Clone)]
pub struct ValidationCoordinator {
    policy: SizePolicy,
    hasher: Arc<dyn ContentHasher>,
}

impl ValidationCoordinator {
    pub fn new(policy: SizePolicy) -> Self {
        Self::with_hasher(policy, Arc::new(Sha256Hasher))
    }

    pub fn with_hasher(policy: SizePolicy, hasher: Arc<dyn ContentHasher>) -> Self {
        Self { policy, hasher }
    }

    pub fn policy(&self) -> SizePolicy {
        self.policy
    }

    /// Validate file size
    pub fn check_size(&self, size: u64) -> IngestResult<()> {
        if size == 0 {
            return Err(IngestError::EmptyFile);
        }

        if size > self.policy.max_file_size {
            return Err(IngestError::FileTooLarge {
                size,
                max: self.policy.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate in-memory content claimed to be `file_name`.
    pub async fn validate_bytes(
        &self,
        data: Bytes,
        file_name: &str,
    ) -> IngestResult<FileValidationResult> {
        let size = data.len() as u64;
        if let Err(e) = self.check_size(size) {
            tracing::debug!(file_name = %file_name, size_bytes = size, error = %e, "Size check failed");
            return Ok(FileValidationResult::rejected(size, e.to_string()));
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if size < self.policy.small_file_warning {
            warnings.push(format!(
                "File is only {} bytes; it may be truncated or a placeholder",
                size
            ));
        }

        let extension = extension_of(file_name);
        let claimed = extension.as_deref().and_then(ModelFormat::from_extension);
        match (&extension, claimed) {
            (None, _) => warnings.push("File name has no extension".to_string()),
            (Some(ext), None) => warnings.push(format!(
                "Unrecognized extension .{} (expected one of: {})",
                ext,
                ModelFormat::known_extensions().join(", ")
            )),
            _ => {}
        }

        let detection = sniff(&data, extension.as_deref());
        match (detection.format, claimed) {
            (None, _) => errors.push(
                "Unrecognized model format: content does not match any known signature"
                    .to_string(),
            ),
            (Some(detected), Some(claimed)) if detected != claimed => warnings.push(format!(
                "Detected format {} does not match the .{} extension",
                detected,
                extension.as_deref().unwrap_or_default()
            )),
            _ => {}
        }

        let hasher = self.hasher.clone();
        let checksum = tokio::task::spawn_blocking(move || hasher.digest(&data))
            .await
            .map_err(|e| IngestError::Internal {
                stage: PipelineStage::Validation,
                message: format!("Checksum task failed: {}", e),
            })?;

        let result = FileValidationResult {
            is_valid: errors.is_empty(),
            format: detection.format,
            checksum: Some(checksum),
            size,
            errors,
            warnings,
        };

        tracing::debug!(
            file_name = %file_name,
            size_bytes = size,
            is_valid = result.is_valid,
            format = ?result.format,
            warnings = result.warnings.len(),
            "Validation completed"
        );

        Ok(result)
    }

    /// Validate a file on disk. The file is stat'ed first and only read if the
    /// size policy allows it.
    pub async fn validate_file(
        &self,
        path: &Path,
        file_name: &str,
    ) -> IngestResult<(FileValidationResult, Option<Bytes>)> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            IngestError::UploadFailed(format!("Failed to stat {}: {}", path.display(), e))
        })?;

        if let Err(e) = self.check_size(metadata.len()) {
            return Ok((FileValidationResult::rejected(metadata.len(), e.to_string()), None));
        }

        let data = Bytes::from(tokio::fs::read(path).await?);
        let result = self.validate_bytes(data.clone(), file_name).await?;
        Ok((result, Some(data)))
    }

    /// Turn an invalid result into the error that rejects the upload.
    pub fn rejection(&self, result: &FileValidationResult) -> Option<IngestError> {
        if result.is_valid {
            return None;
        }

        if let Err(e) = self.check_size(result.size) {
            return Some(e);
        }

        Some(match result.format {
            None => IngestError::UnsupportedFormat(result.errors.join("; ")),
            Some(_) => IngestError::ValidationFailed(result.errors.clone()),
        })
    }
}
