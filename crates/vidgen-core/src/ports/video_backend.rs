//! VideoBackend port - 非同期の動画生成 API
//!
//! create_job でジョブを作り、get_job で状態を問い合わせるだけの
//! ステートレスなラッパーです。ポーリングは `app::poller` の責務。

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::extract::{self, Extracted};
use crate::domain::{ContentItem, RemoteError, RemoteStatus};

/// Body of a "create job" call (model is filled in by the adapter).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateJobRequest {
    pub content: Vec<ContentItem>,
    pub ratio: String,
    pub duration: u32,
    pub watermark: bool,
}

/// Opaque handle returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One answer of a "get job status" call.
///
/// `body` is the whole response; the result payload is read from it with
/// the extraction rules in `domain::extract`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: RemoteStatus,
    pub body: serde_json::Value,
}

impl JobSnapshot {
    pub fn new(status: RemoteStatus, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn video_url(&self) -> Option<Extracted> {
        extract::resolve_video_url(&self.body)
    }

    pub fn error_text(&self) -> String {
        extract::remote_error_text(&self.body)
    }
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobHandle, RemoteError>;

    async fn get_job(&self, handle: &JobHandle) -> Result<JobSnapshot, RemoteError>;
}
