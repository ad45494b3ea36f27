//! modelvault processing library
//!
//! Content inspection for uploaded model artifacts: magic-number format sniffing,
//! heuristic security scanning and the validation coordinator that combines size
//! policy, sniffing and hashing into a single validation result.

pub mod scanner;
pub mod sniffer;
pub mod traits;
pub mod validator;

pub use scanner::{ScanPolicy, SecurityScanner};
pub use sniffer::{sniff, FormatDetection};
pub use traits::ArtifactScanner;
pub use validator::{SizePolicy, ValidationCoordinator};
