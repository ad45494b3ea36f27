//! Heuristic checks run by the security scanner.
//!
//! Each heuristic inspects the buffer independently and reports at most one
//! finding. Adding a check means appending an entry to [`HEURISTICS`].

use modelvault_core::{ModelFormat, RiskLevel};
use regex::Regex;

use crate::sniffer::{has_pickle_marker, sniff, HDF5_MAGIC, PROTOBUF_FIELD1_VARINT, ZIP_MAGIC};

/// Leading bytes of native executables.
const EXECUTABLE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"MZ", "PE"),
    (&[0x7F, 0x45, 0x4C, 0x46], "ELF"),
    (&[0xFE, 0xED, 0xFA, 0xCE], "Mach-O"),
    (&[0xFE, 0xED, 0xFA, 0xCF], "Mach-O 64-bit"),
];

/// (label, pattern) pairs matched against the printable text of the scanned prefix.
const SUSPICIOUS_PATTERNS: &[(&str, &str)] = &[
    ("eval(", r"\beval\s*\("),
    ("exec(", r"\bexec\s*\("),
    ("os.system", r"\bos\.system\b"),
    ("os/posix/nt system", r"(os|posix|nt)\s+system\b"),
    ("builtins eval/exec", r"builtins\s+(eval|exec)\b"),
    ("subprocess", r"\bsubprocess\b"),
    ("__import__", r"__import__"),
    ("importlib", r"\bimportlib\b"),
    ("socket", r"\bsocket\b"),
    ("urllib", r"\burllib\b"),
    ("requests", r"\brequests\.(get|post|put)\b"),
    ("/bin/sh", r"/bin/(ba)?sh\b"),
    ("cmd.exe", r"(?i)\bcmd\.exe\b"),
    ("powershell", r"(?i)\bpowershell\b"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    ExecutableContent,
    SuspiciousPatterns,
    UnexpectedStructure,
    HighEntropy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub kind: FindingKind,
    pub risk: RiskLevel,
    pub threat: String,
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub label: &'static str,
    pub regex: Regex,
}

pub fn compile_patterns() -> Result<Vec<CompiledPattern>, regex::Error> {
    SUSPICIOUS_PATTERNS
        .iter()
        .map(|&(label, pattern)| {
            Ok(CompiledPattern {
                label,
                regex: Regex::new(pattern)?,
            })
        })
        .collect()
}

/// Inputs shared by all heuristics for one scan.
pub struct ScanContext<'a> {
    pub data: &'a [u8],
    /// Declared extension, lowercase without the dot.
    pub extension: Option<&'a str>,
    pub text_prefix_bytes: usize,
    pub patterns: &'a [CompiledPattern],
    pub entropy: f64,
    pub entropy_threshold: f64,
}

pub struct Heuristic {
    pub name: &'static str,
    pub check: fn(&ScanContext<'_>) -> Option<Finding>,
}

pub const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        name: "executable_signature",
        check: check_executable_signature,
    },
    Heuristic {
        name: "suspicious_patterns",
        check: check_suspicious_patterns,
    },
    Heuristic {
        name: "structural_sanity",
        check: check_structure,
    },
    Heuristic {
        name: "entropy",
        check: check_entropy,
    },
];

fn check_executable_signature(ctx: &ScanContext<'_>) -> Option<Finding> {
    EXECUTABLE_SIGNATURES
        .iter()
        .find(|(magic, _)| ctx.data.starts_with(magic))
        .map(|(_, kind)| Finding {
            kind: FindingKind::ExecutableContent,
            risk: RiskLevel::High,
            threat: format!("Executable signature detected ({})", kind),
        })
}

/// Printable ASCII of `data`; every other byte becomes a space so tokens split by
/// binary framing stay separated.
pub fn printable_text(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                ' '
            }
        })
        .collect()
}

fn check_suspicious_patterns(ctx: &ScanContext<'_>) -> Option<Finding> {
    let end = ctx.data.len().min(ctx.text_prefix_bytes);
    let text = printable_text(&ctx.data[..end]);

    let matched: Vec<&str> = ctx
        .patterns
        .iter()
        .filter(|p| p.regex.is_match(&text))
        .map(|p| p.label)
        .collect();

    if matched.is_empty() {
        return None;
    }

    Some(Finding {
        kind: FindingKind::SuspiciousPatterns,
        risk: RiskLevel::Medium,
        threat: format!("Suspicious code patterns found: {}", matched.join(", ")),
    })
}

/// Whether `data` carries the structural signature of `format`.
fn matches_structure(format: ModelFormat, data: &[u8]) -> bool {
    match format {
        ModelFormat::Pickle | ModelFormat::Joblib => has_pickle_marker(data),
        ModelFormat::Keras => data.starts_with(&HDF5_MAGIC),
        ModelFormat::Pytorch => data.starts_with(&ZIP_MAGIC) || has_pickle_marker(data),
        ModelFormat::Onnx => data.first() == Some(&PROTOBUF_FIELD1_VARINT),
    }
}

fn check_structure(ctx: &ScanContext<'_>) -> Option<Finding> {
    let claimed = ctx.extension.and_then(ModelFormat::from_extension);
    let detected = sniff(ctx.data, ctx.extension).format;

    let threat = match (claimed, detected) {
        (Some(claimed), _) if !matches_structure(claimed, ctx.data) => format!(
            "Content does not have the structure of a {} file (detected: {})",
            claimed,
            detected.map_or_else(|| "unknown".to_string(), |f| f.to_string())
        ),
        (Some(claimed), Some(detected)) if detected != claimed => format!(
            "Content is a {} file but the extension claims {}",
            detected, claimed
        ),
        (None, None) => "Content does not match any known model structure".to_string(),
        _ => return None,
    };

    Some(Finding {
        kind: FindingKind::UnexpectedStructure,
        risk: RiskLevel::Medium,
        threat,
    })
}

fn check_entropy(ctx: &ScanContext<'_>) -> Option<Finding> {
    if ctx.entropy <= ctx.entropy_threshold {
        return None;
    }

    Some(Finding {
        kind: FindingKind::HighEntropy,
        risk: RiskLevel::Medium,
        threat: format!(
            "High entropy content ({:.2} bits/byte), possibly packed or encrypted payload",
            ctx.entropy
        ),
    })
}
