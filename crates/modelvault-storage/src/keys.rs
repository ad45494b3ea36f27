//! Shared key generation for storage backends.
//!
//! Key format: `models/{uuid}.{ext}`, or `models/{owner_id}/{uuid}.{ext}` for owned uploads.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 16;

/// Generate a fresh storage key for an artifact.
///
/// Only the extension of the original file name survives, and only after
/// sanitization. All backends must use this format for consistency.
pub fn generate_model_key(owner_id: Option<Uuid>, original_name: &str) -> String {
    let ext = sanitize_extension(original_name);
    match owner_id {
        Some(owner) => format!("models/{}/{}.{}", owner, Uuid::new_v4(), ext),
        None => format!("models/{}.{}", Uuid::new_v4(), ext),
    }
}

/// Lowercase ASCII-alphanumeric extension of `name`, or `bin`.
pub fn sanitize_extension(name: &str) -> String {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => return FALLBACK_EXTENSION.to_string(),
    };

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return FALLBACK_EXTENSION.to_string();
    }

    ext.to_ascii_lowercase()
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key.contains("..")
        || storage_key.starts_with('/')
        || storage_key.contains('\\')
        || storage_key.contains('\0')
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
