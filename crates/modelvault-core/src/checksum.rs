//! SHA-256 content digests
//!
//! The digest is the integrity anchor for every artifact: it is computed during
//! validation, recorded with the stored artifact and recomputed on verification.

use sha2::{Digest, Sha256};
use std::path::Path;
use subtle::ConstantTimeEq;
use tokio::io::AsyncReadExt;

use crate::error::{IngestError, IngestResult};

const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Content hashing seam.
///
/// The pipeline only hashes through this trait so that tests can observe
/// whether hashing happened at all.
pub trait ContentHasher: Send + Sync {
    /// Lowercase hex digest of `data`.
    fn digest(&self, data: &[u8]) -> String;

    fn algorithm(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }

    fn algorithm(&self) -> &'static str {
        "sha256"
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash a file in fixed-size chunks without loading it into memory.
pub async fn digest_file(path: &Path) -> IngestResult<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        IngestError::UploadFailed(format!("Failed to open {} for hashing: {}", path.display(), e))
    })?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Constant-time comparison of two hex digests (case-insensitive).
pub fn digests_match(actual: &str, expected: &str) -> bool {
    let actual = actual.to_ascii_lowercase();
    let expected = expected.to_ascii_lowercase();
    actual.len() == expected.len() && bool::from(actual.as_bytes().ct_eq(expected.as_bytes()))
}

/// Re-hash `data` and fail with [`IngestError::IntegrityMismatch`] if it does not match.
pub fn verify_digest(data: &[u8], expected: &str) -> IngestResult<()> {
    let actual = sha256_hex(data);
    if digests_match(&actual, expected) {
        Ok(())
    } else {
        Err(IngestError::IntegrityMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let data = vec![0x5au8; 4096];
        assert_eq!(Sha256Hasher.digest(&data), Sha256Hasher.digest(&data));
        assert_eq!(Sha256Hasher.digest(&data).len(), 64);
    }

    #[test]
    fn test_single_bit_flip_changes_digest() {
        let data = b"\x89HDF\r\n\x1a\n\x00\x00\x00\x00\x00\x00".to_vec();
        let original = sha256_hex(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(sha256_hex(&flipped), original);
            }
        }
    }

    #[test]
    fn test_verify_digest() {
        let data = b"model weights";
        let digest = sha256_hex(data);
        assert!(verify_digest(data, &digest).is_ok());
        assert!(verify_digest(data, &digest.to_uppercase()).is_ok());

        let err = verify_digest(b"model weightz", &digest).unwrap_err();
        assert!(matches!(err, IngestError::IntegrityMismatch { .. }));
        assert!(!digests_match(&digest, &digest[..10]));
    }

    #[tokio::test]
    async fn test_digest_file_matches_in_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large.bin");
        let data: Vec<u8> = (0..(DIGEST_CHUNK_SIZE * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(digest_file(&path).await.unwrap(), sha256_hex(&data));
    }

    #[tokio::test]
    async fn test_digest_missing_file() {
        let dir = tempdir().unwrap();
        let result = digest_file(&dir.path().join("missing.bin")).await;
        assert!(matches!(result, Err(IngestError::UploadFailed(_))));
    }
}
