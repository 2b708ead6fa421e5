// Cleanup of uploads whose follow-up write failed
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tokio::sync::Mutex;

use super::{Gateway, GatewayError};
use crate::backend::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CleanupOutcome {
    Deleted,
    Failed(String),
}

/// Report of one compensating delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compensation {
    pub file_id: String,
    pub outcome: CleanupOutcome,
}

impl Compensation {
    pub fn succeeded(&self) -> bool {
        self.outcome == CleanupOutcome::Deleted
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CleanupOutcome::Deleted => write!(f, "uploaded file {} was deleted", self.file_id),
            CleanupOutcome::Failed(reason) => write!(
                f,
                "uploaded file {} could not be deleted ({}), queued for retry",
                self.file_id, reason
            ),
        }
    }
}

/// File ids whose cleanup failed and still need deleting.
#[derive(Debug, Default)]
pub struct OrphanedFiles {
    ids: Mutex<BTreeSet<String>>,
}

impl OrphanedFiles {
    pub async fn push(&self, file_id: &str) {
        self.ids.lock().await.insert(file_id.to_string());
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.ids.lock().await.iter().cloned().collect()
    }

    async fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.ids.lock().await)
            .into_iter()
            .collect()
    }
}

impl Gateway {
    /// Delete an upload after `primary` failed and fold the report into the error.
    pub(crate) async fn compensate(&self, file_id: &str, primary: GatewayError) -> GatewayError {
        tracing::warn!(file_id, error = %primary, "Write failed after upload, deleting file");
        let compensation = self.delete_orphan(file_id).await;
        GatewayError::Compensated {
            primary: Box::new(primary),
            compensation,
        }
    }

    async fn delete_orphan(&self, file_id: &str) -> Compensation {
        let outcome = match self.backend.delete_file(file_id).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => CleanupOutcome::Deleted,
            Err(e) => {
                tracing::warn!(file_id, error = %e, "Cleanup of uploaded file failed");
                self.orphans.push(file_id).await;
                CleanupOutcome::Failed(e.to_string())
            }
        };

        Compensation {
            file_id: file_id.to_string(),
            outcome,
        }
    }

    /// Files waiting for a cleanup retry.
    pub async fn orphaned_files(&self) -> Vec<String> {
        self.orphans.snapshot().await
    }

    /// Retry every queued cleanup; failures go back on the queue.
    pub async fn retry_orphaned_files(&self) -> Vec<Compensation> {
        let pending = self.orphans.drain().await;
        let mut reports = Vec::with_capacity(pending.len());
        for file_id in pending {
            reports.push(self.delete_orphan(&file_id).await);
        }

        let cleaned = reports.iter().filter(|r| r.succeeded()).count();
        tracing::info!("Orphan cleanup: {}/{} files deleted", cleaned, reports.len());
        reports
    }
}
