//! modelvault ingestion pipeline
//!
//! The [`UploadOrchestrator`] drives one upload session through
//! validation, security scanning and storage, tracking progress and honouring
//! cancellation at stage boundaries.

pub mod cleanup;
pub mod events;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod telemetry;

pub use cleanup::SessionSweeper;
pub use events::{SessionEvent, SessionEventKind};
pub use orchestrator::{IngestFailure, UploadOrchestrator};
pub use progress::ProgressTracker;
pub use registry::SessionRegistry;
