//! TaskStore port - task 状態の正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - 状態（TaskStatus）と進捗メッセージ
//! - 結果（result / error）
//! - 永続化（history.json のスナップショット）
//!
//! # 実装
//! - `impls::JsonFileTaskStore`: メモリ上の map + JSON ファイル

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{StoreError, TaskId, TaskRecord, TaskStatus, TransitionError};

/// A partial update applied to one record under the store's write lock.
///
/// Returning an error leaves the record untouched.
pub type TaskMutation<'a> =
    Box<dyn FnOnce(&mut TaskRecord) -> Result<(), TransitionError> + Send + 'a>;

/// Counts by status, for health/observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn add(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Processing => self.processing += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// TaskStore は task record の正本
///
/// # 設計原則
/// - 同じ id への update は直列化される（レコードが壊れない）
/// - 読み取りは並行に行える。関連フィールドの途中状態が見えることは許容
///   （進捗表示であってトランザクションではない）
/// - persist はファイル全体を書き換える。読み手が書きかけを見ることはない
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new record. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, record: TaskRecord) -> Result<TaskRecord, StoreError>;

    async fn get(&self, id: TaskId) -> Result<TaskRecord, StoreError>;

    /// Apply `mutation` atomically and return the updated record.
    async fn update(
        &self,
        id: TaskId,
        mutation: TaskMutation<'_>,
    ) -> Result<TaskRecord, StoreError>;

    /// Snapshot of every record, newest first.
    async fn list(&self) -> Result<Vec<TaskRecord>, StoreError>;

    async fn counts(&self) -> Result<TaskCounts, StoreError>;

    /// Write the whole store to durable storage.
    async fn persist(&self) -> Result<(), StoreError>;

    /// Replace in-memory content with the persisted snapshot.
    /// Returns how many records were loaded.
    async fn restore(&self) -> Result<usize, StoreError>;
}
