//! Traits for the processing stages.

use async_trait::async_trait;
use bytes::Bytes;
use modelvault_core::{IngestResult, SecurityScanResult};

/// Security scanning backend used by the orchestrator.
///
/// The built-in implementation is the heuristic [`SecurityScanner`](crate::SecurityScanner);
/// other engines can be plugged in behind the same interface.
#[async_trait]
pub trait ArtifactScanner: Send + Sync {
    /// Scan `data`. `file_name` is the name claimed by the uploader.
    async fn scan(&self, data: Bytes, file_name: &str) -> IngestResult<SecurityScanResult>;

    fn name(&self) -> &'static str;
}
