use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::registry::SessionRegistry;

/// Periodically drops terminal sessions older than the retention window.
#[derive(Clone)]
pub struct SessionSweeper {
    registry: Arc<SessionRegistry>,
    retention: chrono::Duration,
    sweep_interval: Duration,
}

impl SessionSweeper {
    pub fn new(
        registry: Arc<SessionRegistry>,
        retention: chrono::Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            registry,
            retention,
            sweep_interval,
        }
    }

    /// Start the background sweep task.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);

            loop {
                sweep_interval.tick().await;
                self.sweep_once().await;
            }
        })
    }

    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_sessions"))]
    pub async fn sweep_once(&self) -> usize {
        let removed = self.registry.sweep_expired(self.retention, Utc::now()).await;
        if removed > 0 {
            tracing::info!(
                removed,
                retention_hours = self.retention.num_hours(),
                "Expired upload sessions removed"
            );
        } else {
            tracing::debug!("No expired upload sessions");
        }
        removed
    }
}

/// Best-effort removal of a spooled upload. Failures are logged, never returned.
pub async fn remove_temp_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Temp upload removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            error = %e,
            path = %path.display(),
            "Failed to remove temp upload during cleanup"
        ),
    }
}
