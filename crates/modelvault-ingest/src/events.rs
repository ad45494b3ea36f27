use chrono::{DateTime, Utc};
use modelvault_core::{PipelineStage, SessionId, UploadSession, UploadStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Created,
    StatusChanged,
    Progress,
}

/// Notification emitted on every session transition or progress update.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session_id: SessionId,
    pub status: UploadStatus,
    pub stage: Option<PipelineStage>,
    pub uploaded_bytes: u64,
    pub estimated_time_remaining: Option<u64>,
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn from_session(kind: SessionEventKind, session: &UploadSession) -> Self {
        Self {
            kind,
            session_id: session.id,
            status: session.status,
            stage: session.stage,
            uploaded_bytes: session.uploaded_bytes,
            estimated_time_remaining: session.estimated_time_remaining,
            at: Utc::now(),
        }
    }
}
