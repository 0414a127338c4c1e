//! ArtifactStore port - 生成済み動画のローカル保存
//!
//! リモートの URL から bytes を取得し、task id から決まるパスに書き込みます。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{ArtifactError, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub local_path: PathBuf,
    pub filename: String,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download `url` to `video_<task_id>.<ext>` in the managed directory.
    async fn fetch(&self, task_id: TaskId, url: &str) -> Result<StoredArtifact, ArtifactError>;
}
