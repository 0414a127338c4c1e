//! Status - サービス全体の状態（/health 用）

use serde::Serialize;

use crate::domain::StoreError;
use crate::ports::TaskCounts;

use super::builder::AppHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub tasks: TaskCounts,
    /// Free slots in the run queue.
    pub queue_available: usize,
    pub workers: usize,
}

impl AppHandle {
    pub async fn health(&self) -> Result<HealthReport, StoreError> {
        Ok(HealthReport {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            tasks: self.store.counts().await?,
            queue_available: self.queue_available(),
            workers: self.settings.workers,
        })
    }
}
