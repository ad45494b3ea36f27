//! In-process session registry
//!
//! The map itself is guarded by an `RwLock`; each session has its own mutex so
//! transitions on one session are serialized without blocking the others.

use chrono::{DateTime, Duration, Utc};
use modelvault_core::{SessionId, UploadSession};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::progress::ProgressTracker;

/// Mutable state of one tracked session.
#[derive(Debug)]
pub struct TrackedSession {
    pub session: UploadSession,
    pub progress: ProgressTracker,
    /// Set once storage has begun. Cancellation is refused from then on.
    pub committing: bool,
}

pub type SessionHandle = Arc<Mutex<TrackedSession>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: UploadSession) -> SessionHandle {
        let id = session.id;
        let handle = Arc::new(Mutex::new(TrackedSession {
            progress: ProgressTracker::new(session.declared_size),
            session,
            committing: false,
        }));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self, id: &SessionId) -> Option<UploadSession> {
        let handle = self.get(id).await?;
        let tracked = handle.lock().await;
        Some(tracked.session.clone())
    }

    pub async fn remove(&self, id: &SessionId) -> Option<UploadSession> {
        let handle = self.sessions.write().await.remove(id)?;
        let tracked = handle.lock().await;
        Some(tracked.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Sessions that have not reached a terminal state, oldest first.
    pub async fn active(&self) -> Vec<UploadSession> {
        let mut active = Vec::new();
        for handle in self.handles().await {
            let tracked = handle.lock().await;
            if !tracked.session.is_terminal() {
                active.push(tracked.session.clone());
            }
        }
        active.sort_by_key(|s| s.started_at);
        active
    }

    /// Drop terminal sessions that finished more than `retention` before `now`.
    pub async fn sweep_expired(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - retention;

        let mut expired = Vec::new();
        for (id, handle) in self.sessions.read().await.iter() {
            // Sessions locked by an in-flight run are not terminal; skip them.
            let Ok(tracked) = handle.try_lock() else {
                continue;
            };
            let finished_before_cutoff = tracked
                .session
                .finished_at
                .is_some_and(|finished| finished < cutoff);
            if tracked.session.is_terminal() && finished_before_cutoff {
                expired.push(*id);
            }
        }

        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            sessions.remove(id);
        }
        expired.len()
    }
}
