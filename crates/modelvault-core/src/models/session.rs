use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{IngestError, PipelineStage, UploadErrorDetails};

/// Opaque identifier of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        SessionId(id)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|e| anyhow::anyhow!("Invalid session id {}: {}", s, e))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::Cancelled
        )
    }

    /// Legal edges of the session state machine. Terminal states have no exits.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Processing)
                | (UploadStatus::Pending, UploadStatus::Cancelled)
                | (UploadStatus::Processing, UploadStatus::Completed)
                | (UploadStatus::Processing, UploadStatus::Failed)
                | (UploadStatus::Processing, UploadStatus::Cancelled)
        )
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
            UploadStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "processing" => Ok(UploadStatus::Processing),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            "cancelled" => Ok(UploadStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

/// Tracked state of one ingestion attempt.
///
/// Only the orchestrator mutates a session, always through [`UploadSession::transition`]
/// or [`UploadSession::fail`], so a terminal session can never be reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: SessionId,
    pub file_name: String,
    pub declared_size: u64,
    pub uploaded_bytes: u64,
    pub status: UploadStatus,
    /// Stage currently running. Advisory only.
    pub stage: Option<PipelineStage>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Seconds, extrapolated from the observed transfer rate.
    pub estimated_time_remaining: Option<u64>,
    pub error: Option<UploadErrorDetails>,
}

impl UploadSession {
    pub fn new(file_name: impl Into<String>, declared_size: u64) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            file_name: file_name.into(),
            declared_size,
            uploaded_bytes: 0,
            status: UploadStatus::Pending,
            stage: None,
            started_at: now,
            updated_at: now,
            finished_at: None,
            estimated_time_remaining: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, rejecting any edge the state machine does not allow.
    pub fn transition(&mut self, next: UploadStatus) -> Result<(), IngestError> {
        if !self.status.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.finished_at = Some(now);
            self.estimated_time_remaining = None;
            if next == UploadStatus::Completed {
                self.uploaded_bytes = self.declared_size.max(self.uploaded_bytes);
                self.estimated_time_remaining = Some(0);
            }
        }
        Ok(())
    }

    /// Transition to `failed` and record the classified error.
    pub fn fail(&mut self, details: UploadErrorDetails) -> Result<(), IngestError> {
        self.transition(UploadStatus::Failed)?;
        self.stage = Some(details.stage);
        self.error = Some(details);
        Ok(())
    }

    /// Fraction of the declared size already consumed, in `[0, 1]`.
    pub fn progress_ratio(&self) -> f64 {
        if self.declared_size == 0 {
            return if self.status == UploadStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        (self.uploaded_bytes as f64 / self.declared_size as f64).min(1.0)
    }
}
