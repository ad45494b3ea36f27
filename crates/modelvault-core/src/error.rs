//! Error types module
//!
//! Every failure the ingestion pipeline can produce is unified under [`IngestError`].
//! Variants self-describe their taxonomy code, the pipeline stage they belong to,
//! remediation hints and log level through [`ErrorMetadata`], and convert into the
//! user-facing [`UploadErrorDetails`] that callers receive instead of raw errors.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use serde::{Deserialize, Serialize};

use crate::models::{RiskLevel, SessionId, UploadStatus};

/// Result type for pipeline operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected content and recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Error taxonomy reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    SecurityError,
    StorageError,
    NotFound,
    TimeoutError,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::SecurityError => "SECURITY_ERROR",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Validation,
    Upload,
    Processing,
    Storage,
    Database,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineStage::Validation => write!(f, "validation"),
            PipelineStage::Upload => write!(f, "upload"),
            PipelineStage::Processing => write!(f, "processing"),
            PipelineStage::Storage => write!(f, "storage"),
            PipelineStage::Database => write!(f, "database"),
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// Taxonomy code (e.g. `VALIDATION_ERROR`)
    fn error_code(&self) -> ErrorCode;

    /// Stage in which the error occurred
    fn stage(&self) -> PipelineStage;

    /// Whether retrying the same request can succeed
    fn is_recoverable(&self) -> bool;

    /// Actionable hints for the client
    fn suggestions(&self) -> &'static [&'static str];

    /// Client-facing message, never containing internal paths or sources
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported or unrecognized model format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Unsafe content detected (risk: {risk_level}): {}", .threats.join("; "))]
    UnsafeContent {
        risk_level: RiskLevel,
        threats: Vec<String>,
    },

    #[error("Security scan failed: {0}")]
    ScanFailed(String),

    #[error("Upload read failed: {0}")]
    UploadFailed(String),

    #[error("Storage error: {0}")]
    StorageFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid encryption key: {0}")]
    InvalidEncryptionKey(String),

    #[error("Decryption failed: authentication tag mismatch or corrupted ciphertext")]
    DecryptionFailed,

    #[error("Integrity check failed: expected checksum {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("Upload session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Stored artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Stage {stage} timed out after {seconds} seconds")]
    Timeout { stage: PipelineStage, seconds: u64 },

    #[error("Upload cancelled during {stage}")]
    Cancelled { stage: PipelineStage },

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: UploadStatus, to: UploadStatus },

    #[error("Session {0} can no longer be cancelled: storage has already started")]
    CancellationTooLate(SessionId),

    #[error("Internal error during {stage}: {message}")]
    Internal {
        stage: PipelineStage,
        message: String,
    },
}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        IngestError::UploadFailed(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (code, recoverable, suggestions, sensitive, log_level).
/// Stage and client message stay per-variant because some variants carry them.
fn ingest_error_static_metadata(
    err: &IngestError,
) -> (
    ErrorCode,
    bool,
    &'static [&'static str],
    bool,
    LogLevel,
) {
    match err {
        IngestError::EmptyFile => (
            ErrorCode::ValidationError,
            false,
            &[
                "Check the file is not corrupted",
                "Re-export the model and upload it again",
            ],
            false,
            LogLevel::Debug,
        ),
        IngestError::FileTooLarge { .. } => (
            ErrorCode::ValidationError,
            false,
            &[
                "Reduce file size",
                "Prune or quantize the model before exporting",
            ],
            false,
            LogLevel::Debug,
        ),
        IngestError::UnsupportedFormat(_) => (
            ErrorCode::ValidationError,
            false,
            &[
                "Upload a Keras (.h5), pickle (.pkl), ONNX (.onnx), PyTorch (.pt) or joblib (.joblib) model",
                "Re-export the model",
                "Check the file is not corrupted",
            ],
            false,
            LogLevel::Debug,
        ),
        IngestError::ValidationFailed(_) => (
            ErrorCode::ValidationError,
            false,
            &["Check the file is not corrupted", "Re-export the model"],
            false,
            LogLevel::Debug,
        ),
        IngestError::UnsafeContent { .. } => (
            ErrorCode::SecurityError,
            false,
            &[
                "Re-export the model from a trusted environment",
                "Prefer formats without embedded code such as ONNX",
                "Contact support if you believe this is a false positive",
            ],
            false,
            LogLevel::Warn,
        ),
        IngestError::ScanFailed(_) => (
            ErrorCode::SecurityError,
            true,
            &["Retry after a short delay"],
            true,
            LogLevel::Error,
        ),
        IngestError::UploadFailed(_) => (
            ErrorCode::StorageError,
            true,
            &["Retry the upload", "Check your network connection"],
            true,
            LogLevel::Error,
        ),
        IngestError::StorageFailed(_) => (
            ErrorCode::StorageError,
            true,
            &["Retry after a short delay"],
            true,
            LogLevel::Error,
        ),
        IngestError::EncryptionFailed(_) => (
            ErrorCode::StorageError,
            true,
            &["Retry after a short delay"],
            true,
            LogLevel::Error,
        ),
        IngestError::InvalidEncryptionKey(_) => (
            ErrorCode::StorageError,
            false,
            &["Supply the encryption key returned when the model was uploaded"],
            false,
            LogLevel::Debug,
        ),
        IngestError::DecryptionFailed => (
            ErrorCode::StorageError,
            false,
            &[
                "Verify the encryption key belongs to this artifact",
                "Re-upload the model if the stored artifact was tampered with",
            ],
            false,
            LogLevel::Warn,
        ),
        IngestError::IntegrityMismatch { .. } => (
            ErrorCode::StorageError,
            false,
            &["Re-upload the model; the stored artifact is corrupted"],
            false,
            LogLevel::Error,
        ),
        IngestError::SessionNotFound(_) => (
            ErrorCode::NotFound,
            false,
            &["Verify the upload session ID exists and has not expired"],
            false,
            LogLevel::Debug,
        ),
        IngestError::ArtifactNotFound(_) => (
            ErrorCode::NotFound,
            false,
            &["Verify the storage path of the model"],
            false,
            LogLevel::Debug,
        ),
        IngestError::Timeout { .. } => (
            ErrorCode::TimeoutError,
            true,
            &["Retry the upload", "Reduce file size"],
            false,
            LogLevel::Warn,
        ),
        IngestError::Cancelled { .. } => (
            ErrorCode::Cancelled,
            true,
            &["Start a new upload if the cancellation was unintended"],
            false,
            LogLevel::Debug,
        ),
        IngestError::InvalidTransition { .. } => (
            ErrorCode::ValidationError,
            false,
            &["Check the session status before issuing this request"],
            false,
            LogLevel::Debug,
        ),
        IngestError::CancellationTooLate(_) => (
            ErrorCode::ValidationError,
            false,
            &["Delete the stored model once the upload completes"],
            false,
            LogLevel::Debug,
        ),
        IngestError::Internal { stage, .. } => (
            match stage {
                PipelineStage::Validation => ErrorCode::ValidationError,
                PipelineStage::Processing => ErrorCode::SecurityError,
                _ => ErrorCode::StorageError,
            },
            true,
            &["Retry after a short delay"],
            true,
            LogLevel::Error,
        ),
    }
}

impl IngestError {
    /// Get the error type name for detailed logging
    pub fn error_type(&self) -> &'static str {
        match self {
            IngestError::EmptyFile => "EmptyFile",
            IngestError::FileTooLarge { .. } => "FileTooLarge",
            IngestError::UnsupportedFormat(_) => "UnsupportedFormat",
            IngestError::ValidationFailed(_) => "ValidationFailed",
            IngestError::UnsafeContent { .. } => "UnsafeContent",
            IngestError::ScanFailed(_) => "ScanFailed",
            IngestError::UploadFailed(_) => "UploadFailed",
            IngestError::StorageFailed(_) => "StorageFailed",
            IngestError::EncryptionFailed(_) => "EncryptionFailed",
            IngestError::InvalidEncryptionKey(_) => "InvalidEncryptionKey",
            IngestError::DecryptionFailed => "DecryptionFailed",
            IngestError::IntegrityMismatch { .. } => "IntegrityMismatch",
            IngestError::SessionNotFound(_) => "SessionNotFound",
            IngestError::ArtifactNotFound(_) => "ArtifactNotFound",
            IngestError::Timeout { .. } => "Timeout",
            IngestError::Cancelled { .. } => "Cancelled",
            IngestError::InvalidTransition { .. } => "InvalidTransition",
            IngestError::CancellationTooLate(_) => "CancellationTooLate",
            IngestError::Internal { .. } => "Internal",
        }
    }

    /// Checksum mismatches and failed decryption can never be fixed by retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::DecryptionFailed | IngestError::IntegrityMismatch { .. }
        )
    }

    /// Convert into the structured, user-safe error record returned to callers.
    pub fn to_details(&self) -> UploadErrorDetails {
        UploadErrorDetails::from(self)
    }
}

impl ErrorMetadata for IngestError {
    fn error_code(&self) -> ErrorCode {
        ingest_error_static_metadata(self).0
    }

    fn stage(&self) -> PipelineStage {
        match self {
            IngestError::EmptyFile
            | IngestError::FileTooLarge { .. }
            | IngestError::UnsupportedFormat(_)
            | IngestError::ValidationFailed(_) => PipelineStage::Validation,
            IngestError::UploadFailed(_) => PipelineStage::Upload,
            IngestError::UnsafeContent { .. }
            | IngestError::ScanFailed(_)
            | IngestError::SessionNotFound(_)
            | IngestError::InvalidTransition { .. }
            | IngestError::CancellationTooLate(_) => PipelineStage::Processing,
            IngestError::StorageFailed(_)
            | IngestError::EncryptionFailed(_)
            | IngestError::InvalidEncryptionKey(_)
            | IngestError::DecryptionFailed
            | IngestError::IntegrityMismatch { .. }
            | IngestError::ArtifactNotFound(_) => PipelineStage::Storage,
            IngestError::Timeout { stage, .. }
            | IngestError::Cancelled { stage }
            | IngestError::Internal { stage, .. } => *stage,
        }
    }

    fn is_recoverable(&self) -> bool {
        ingest_error_static_metadata(self).1
    }

    fn suggestions(&self) -> &'static [&'static str] {
        ingest_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        ingest_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::EmptyFile => "The uploaded file is empty".to_string(),
            IngestError::FileTooLarge { max, .. } => format!(
                "File size exceeds maximum allowed size of {} MB",
                max / 1024 / 1024
            ),
            IngestError::UnsupportedFormat(_) => {
                "The file is not a recognized model format".to_string()
            }
            IngestError::ValidationFailed(errors) => errors.join("; "),
            IngestError::UnsafeContent { threats, .. } => format!(
                "File rejected by security scan: {}",
                threats.join("; ")
            ),
            IngestError::ScanFailed(_) => "Security scanning temporarily unavailable".to_string(),
            IngestError::UploadFailed(_) => "Failed to read the uploaded file".to_string(),
            IngestError::StorageFailed(_) => "Failed to access storage".to_string(),
            IngestError::EncryptionFailed(_) => "Failed to encrypt the model".to_string(),
            IngestError::InvalidEncryptionKey(_) => "The encryption key is malformed".to_string(),
            IngestError::DecryptionFailed => {
                "The model could not be decrypted with the supplied key".to_string()
            }
            IngestError::IntegrityMismatch { .. } => {
                "The stored model failed its integrity check".to_string()
            }
            IngestError::SessionNotFound(id) => format!("Upload session {} not found", id),
            IngestError::ArtifactNotFound(_) => "Stored model not found".to_string(),
            IngestError::Timeout { stage, seconds } => format!(
                "The upload stalled during {} and timed out after {} seconds",
                stage, seconds
            ),
            IngestError::Cancelled { .. } => "The upload was cancelled".to_string(),
            IngestError::InvalidTransition { from, .. } => {
                format!("The upload session is already {}", from)
            }
            IngestError::CancellationTooLate(_) => {
                "The upload is already being stored and can no longer be cancelled".to_string()
            }
            IngestError::Internal { .. } => "Internal error".to_string(),
        }
    }
}

/// Classified failure handed to the caller.
///
/// Constructed once at the point of failure and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    pub stage: PipelineStage,
    pub suggestions: Vec<String>,
}

impl From<&IngestError> for UploadErrorDetails {
    fn from(err: &IngestError) -> Self {
        UploadErrorDetails {
            code: err.error_code(),
            message: err.client_message(),
            stage: err.stage(),
            suggestions: err.suggestions().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Display for UploadErrorDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {} (stage: {})", self.code, self.message, self.stage)
    }
}
