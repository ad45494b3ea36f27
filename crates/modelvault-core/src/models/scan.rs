use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Which heuristic families fired.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDetails {
    pub has_executable_content: bool,
    pub has_suspicious_patterns: bool,
    pub has_unexpected_structure: bool,
}

/// Outcome of the security scan stage.
///
/// Heuristic, not a guarantee: a clean result only means none of the
/// bounded checks fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScanResult {
    pub is_safe: bool,
    pub risk_level: RiskLevel,
    pub threats: Vec<String>,
    pub scan_details: ScanDetails,
    /// Shannon entropy of the scanned buffer, bits per byte.
    pub entropy: f64,
}
