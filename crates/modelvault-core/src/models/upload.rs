use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::{FileValidationResult, SecurityScanResult, SessionId, StoredArtifact};

/// Handle to an upload already spooled to a temporary file by the web layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFile {
    pub path: PathBuf,
    pub original_name: String,
    pub declared_size: u64,
}

impl IncomingFile {
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>, declared_size: u64) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            declared_size,
        }
    }

    /// Lowercase extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOptions {
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default = "default_require_security_scan")]
    pub require_security_scan: bool,
    /// Owner of the artifact. Scopes the storage key when set.
    pub user_id: Option<Uuid>,
    pub model_name: Option<String>,
    pub description: Option<String>,
}

fn default_require_security_scan() -> bool {
    true
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            encrypt: false,
            require_security_scan: default_require_security_scan(),
            user_id: None,
            model_name: None,
            description: None,
        }
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub session_id: SessionId,
    pub stored_artifact: StoredArtifact,
    pub validation: FileValidationResult,
    /// `None` when scanning was disabled for the upload.
    pub scan: Option<SecurityScanResult>,
}
