//! Magic-number format detection
//!
//! Formats are identified from their leading bytes using a signature table that is
//! evaluated in order; the first matching entry wins. The declared extension is
//! only consulted to disambiguate signatures that are too weak on their own, never
//! as the sole criterion.

use modelvault_core::ModelFormat;
use serde::Serialize;
use std::path::Path;

pub const HDF5_MAGIC: [u8; 8] = [0x89, 0x48, 0x44, 0x46, 0x0D, 0x0A, 0x1A, 0x0A];
pub const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
/// Protobuf tag for field 1, wire type varint (`ModelProto.ir_version`).
pub const PROTOBUF_FIELD1_VARINT: u8 = 0x08;
pub const PICKLE_PROTO: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatDetection {
    pub format: Option<ModelFormat>,
    pub is_valid: bool,
}

impl FormatDetection {
    fn unknown() -> Self {
        Self {
            format: None,
            is_valid: false,
        }
    }
}

struct Signature {
    format: ModelFormat,
    description: &'static str,
    matches: fn(&[u8], Option<&str>) -> bool,
}

/// Priority-ordered signature table. Append entries to support new formats.
const SIGNATURES: &[Signature] = &[
    Signature {
        format: ModelFormat::Keras,
        description: "HDF5 superblock",
        matches: |data, _| data.starts_with(&HDF5_MAGIC),
    },
    Signature {
        format: ModelFormat::Pickle,
        description: "pickle protocol 3/4",
        matches: |data, _| data.starts_with(&[PICKLE_PROTO, 0x03]) || data.starts_with(&[PICKLE_PROTO, 0x04]),
    },
    Signature {
        format: ModelFormat::Onnx,
        description: "protobuf field 1 varint",
        matches: |data, ext| data.first() == Some(&PROTOBUF_FIELD1_VARINT) && ext == Some("onnx"),
    },
    Signature {
        format: ModelFormat::Pytorch,
        description: "ZIP archive or legacy pickle protocol 2",
        matches: |data, _| data.starts_with(&ZIP_MAGIC) || data.starts_with(&[PICKLE_PROTO, 0x02]),
    },
    Signature {
        format: ModelFormat::Joblib,
        description: "pickle protocol 5",
        matches: |data, ext| data.starts_with(&[PICKLE_PROTO, 0x05]) && ext == Some("joblib"),
    },
];

/// Lowercase extension of `file_name` without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Detect the model format of `data`.
///
/// `extension` is the declared extension (with or without a leading dot, any case).
pub fn sniff(data: &[u8], extension: Option<&str>) -> FormatDetection {
    if data.is_empty() {
        return FormatDetection::unknown();
    }

    let ext = extension.map(|e| e.trim_start_matches('.').to_lowercase());
    let ext = ext.as_deref();

    match SIGNATURES.iter().find(|sig| (sig.matches)(data, ext)) {
        Some(sig) => {
            tracing::debug!(
                format = %sig.format,
                signature = sig.description,
                "Model format detected"
            );
            FormatDetection {
                format: Some(sig.format),
                is_valid: true,
            }
        }
        None => FormatDetection::unknown(),
    }
}

/// Whether `data` starts with a pickle protocol marker (`80 02`..`80 05`).
pub fn has_pickle_marker(data: &[u8]) -> bool {
    matches!(data, [PICKLE_PROTO, 0x02..=0x05, ..])
}
