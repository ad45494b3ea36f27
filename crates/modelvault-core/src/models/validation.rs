use serde::{Deserialize, Serialize};

use super::ModelFormat;

/// Outcome of the validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidationResult {
    pub is_valid: bool,
    pub format: Option<ModelFormat>,
    /// Hex SHA-256 of the content. `None` when validation stopped before hashing.
    pub checksum: Option<String>,
    pub size: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FileValidationResult {
    /// Result for a file rejected before its content was read.
    pub fn rejected(size: u64, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            format: None,
            checksum: None,
            size,
            errors: vec![error.into()],
            warnings: Vec::new(),
        }
    }
}
