//! Heuristic security scanner for model artifacts
//!
//! Runs a bounded set of independent heuristics (executable signatures, suspicious
//! code patterns, structural sanity, entropy) and aggregates them into a
//! [`SecurityScanResult`]. This is a heuristic, not an antivirus engine: a clean
//! result only means none of the checks fired.

mod entropy;
mod heuristics;

use async_trait::async_trait;
use bytes::Bytes;
use modelvault_core::{
    IngestConfig, IngestError, IngestResult, PipelineStage, RiskLevel, ScanDetails,
    SecurityScanResult,
};
use std::time::Instant;

use crate::sniffer::extension_of;
use crate::traits::ArtifactScanner;

pub use entropy::shannon_entropy;
pub use heuristics::{printable_text, Finding, FindingKind, HEURISTICS};

use heuristics::{compile_patterns, CompiledPattern, ScanContext};

const DEFAULT_ENTROPY_THRESHOLD: f64 = 7.5;
const DEFAULT_TEXT_PREFIX_BYTES: usize = 10 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPolicy {
    pub entropy_threshold: f64,
    pub text_prefix_bytes: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            text_prefix_bytes: DEFAULT_TEXT_PREFIX_BYTES,
        }
    }
}

impl From<&IngestConfig> for ScanPolicy {
    fn from(config: &IngestConfig) -> Self {
        Self {
            entropy_threshold: config.entropy_threshold,
            text_prefix_bytes: config.scan_text_prefix_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityScanner {
    policy: ScanPolicy,
    patterns: Vec<CompiledPattern>,
}

impl SecurityScanner {
    pub fn new(policy: ScanPolicy) -> IngestResult<Self> {
        let patterns = compile_patterns().map_err(|e| {
            IngestError::ScanFailed(format!("Failed to compile scan patterns: {}", e))
        })?;
        Ok(Self { policy, patterns })
    }

    pub fn policy(&self) -> ScanPolicy {
        self.policy
    }

    /// Run every heuristic against `data` and aggregate the findings.
    pub fn scan_bytes(&self, data: &[u8], file_name: &str) -> SecurityScanResult {
        let extension = extension_of(file_name);
        let entropy = shannon_entropy(data);
        let ctx = ScanContext {
            data,
            extension: extension.as_deref(),
            text_prefix_bytes: self.policy.text_prefix_bytes,
            patterns: &self.patterns,
            entropy,
            entropy_threshold: self.policy.entropy_threshold,
        };

        let findings: Vec<Finding> = HEURISTICS
            .iter()
            .filter_map(|heuristic| {
                let finding = (heuristic.check)(&ctx)?;
                tracing::warn!(
                    heuristic = heuristic.name,
                    risk = %finding.risk,
                    file_name = %file_name,
                    threat = %finding.threat,
                    "Scan heuristic fired"
                );
                Some(finding)
            })
            .collect();

        aggregate(findings, entropy)
    }
}

/// Combine findings: the highest risk wins and executable content is never safe.
fn aggregate(findings: Vec<Finding>, entropy: f64) -> SecurityScanResult {
    let mut details = ScanDetails::default();
    let mut risk_level = RiskLevel::Low;
    let mut threats = Vec::with_capacity(findings.len());

    for finding in findings {
        match finding.kind {
            FindingKind::ExecutableContent => details.has_executable_content = true,
            FindingKind::SuspiciousPatterns => details.has_suspicious_patterns = true,
            FindingKind::UnexpectedStructure => details.has_unexpected_structure = true,
            FindingKind::HighEntropy => {}
        }
        risk_level = risk_level.max(finding.risk);
        threats.push(finding.threat);
    }

    SecurityScanResult {
        is_safe: risk_level != RiskLevel::High && !details.has_executable_content,
        risk_level,
        threats,
        scan_details: details,
        entropy,
    }
}

#[async_trait]
impl ArtifactScanner for SecurityScanner {
    async fn scan(&self, data: Bytes, file_name: &str) -> IngestResult<SecurityScanResult> {
        let start = Instant::now();
        let scanner = self.clone();
        let name = file_name.to_string();
        let size = data.len();

        let result = tokio::task::spawn_blocking(move || scanner.scan_bytes(&data, &name))
            .await
            .map_err(|e| IngestError::Internal {
                stage: PipelineStage::Processing,
                message: format!("Scan task failed: {}", e),
            })?;

        tracing::info!(
            file_name = %file_name,
            size_bytes = size,
            is_safe = result.is_safe,
            risk_level = %result.risk_level,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Security scan completed"
        );

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
