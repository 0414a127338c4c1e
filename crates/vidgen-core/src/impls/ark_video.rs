//! ArkVideoBackend - Ark の contents/generations API
//!
//! - `POST {base}/contents/generations/tasks` でジョブ作成 → `{"id": ...}`
//! - `GET {base}/contents/generations/tasks/{id}` で状態取得
//!
//! 1 回のリクエスト/レスポンスだけを扱う。リトライもポーリングもしない。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{ContentItem, RemoteError, RemoteStatus};
use crate::impls::http;
use crate::ports::{CreateJobRequest, JobHandle, JobSnapshot, VideoBackend};

const TASKS_PATH: &str = "contents/generations/tasks";

pub struct ArkVideoBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    model: &'a str,
    content: &'a [ContentItem],
    ratio: &'a str,
    duration: u32,
    watermark: bool,
}

impl ArkVideoBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    fn tasks_url(&self) -> String {
        format!("{}/{TASKS_PATH}", self.base_url)
    }

    fn create_body<'a>(&'a self, request: &'a CreateJobRequest) -> CreateBody<'a> {
        CreateBody {
            model: &self.model,
            content: &request.content,
            ratio: &request.ratio,
            duration: request.duration,
            watermark: request.watermark,
        }
    }
}

/// `{"id": "..."}` -> handle.
pub(crate) fn parse_created(body: &Value) -> Result<JobHandle, RemoteError> {
    body.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(JobHandle::new)
        .ok_or_else(|| RemoteError::Decode(format!("no job id in response: {body}")))
}

/// Status answer -> snapshot. The whole body is kept for URL extraction.
pub(crate) fn parse_snapshot(body: Value) -> Result<JobSnapshot, RemoteError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(RemoteStatus::from)
        .ok_or_else(|| RemoteError::Decode(format!("no status in response: {body}")))?;
    Ok(JobSnapshot::new(status, body))
}

#[async_trait]
impl VideoBackend for ArkVideoBackend {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobHandle, RemoteError> {
        let builder = self
            .client
            .post(self.tasks_url())
            .json(&self.create_body(request));
        let response = http::authorize(builder, self.api_key.as_deref())
            .send()
            .await?;
        let body = http::json_body(response).await?;
        let handle = parse_created(&body)?;
        tracing::debug!(remote_job_id = %handle, items = request.content.len(), "remote job created");
        Ok(handle)
    }

    async fn get_job(&self, handle: &JobHandle) -> Result<JobSnapshot, RemoteError> {
        let builder = self
            .client
            .get(format!("{}/{}", self.tasks_url(), handle.as_str()));
        let response = http::authorize(builder, self.api_key.as_deref())
            .send()
            .await?;
        parse_snapshot(http::json_body(response).await?)
    }
}
