//! Data models for the ingestion pipeline
//!
//! Each sub-module covers one stage of an upload: the session state machine,
//! validation and scan results, and the metadata of a stored artifact.

mod artifact;
mod format;
mod scan;
mod session;
mod upload;
mod validation;

pub use artifact::*;
pub use format::*;
pub use scan::*;
pub use session::*;
pub use upload::*;
pub use validation::*;
