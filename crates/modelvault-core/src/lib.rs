//! modelvault core library
//!
//! Domain models, the pipeline error taxonomy, configuration, and the checksum
//! and encryption primitives shared by every modelvault crate.

pub mod checksum;
pub mod config;
pub mod encryption;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use checksum::{sha256_hex, verify_digest, ContentHasher, Sha256Hasher};
pub use config::IngestConfig;
pub use encryption::{EncryptionKey, FileCipher};
pub use error::{
    ErrorCode, ErrorMetadata, IngestError, IngestResult, LogLevel, PipelineStage,
    UploadErrorDetails,
};
pub use models::{
    FileValidationResult, IncomingFile, IngestionOutcome, ModelFormat, RiskLevel, ScanDetails,
    SecurityScanResult, SessionId, StoredArtifact, UploadOptions, UploadSession, UploadStatus,
};
pub use storage_types::StorageBackend;
