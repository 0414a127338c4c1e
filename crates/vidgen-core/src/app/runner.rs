//! TaskRunner - 1 つの task を最初から最後まで動かす
//!
//! # フロー
//! 1. processing にする
//! 2. （任意）プロンプト強化。失敗しても元のプロンプトで続ける
//! 3. mode ごとに content を組み立てる
//! 4. リモートジョブを作成して Poller で待つ（進捗は store に流す）
//! 5. 成功なら動画をダウンロードして completed、それ以外は failed
//! 6. どちらの場合も history.json を書き出す
//!
//! run() はエラーを返さない。失敗はすべて task の `error` に入る。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::content::{data_url, image_mime, video_mime};
use crate::domain::task::progress;
use crate::domain::{
    ContentItem, GenerationMode, PollOutcome, RemoteStatus, RunError, StoreError, TaskId,
    TaskRecord, TaskResult,
};
use crate::ports::{
    ArtifactStore, Clock, CreateJobRequest, EnhanceRequest, PromptEnhancer, TaskStore,
    VideoBackend,
};

use super::poller::{Poller, ProgressSink};

pub const DEFAULT_MOTION_TYPE: &str = "natural";

/// User-supplied material for one run. Paths are already resolved inside the
/// upload directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationInputs {
    pub text: String,
    pub image: Option<PathBuf>,
    pub video: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub ratio: String,
    pub duration: u32,
    pub watermark: bool,
    pub enhance_prompt: bool,
    pub style: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub task_id: TaskId,
    pub mode: GenerationMode,
    pub inputs: GenerationInputs,
    pub options: RunOptions,
}

pub struct TaskRunner {
    store: Arc<dyn TaskStore>,
    backend: Arc<dyn VideoBackend>,
    enhancer: Arc<dyn PromptEnhancer>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    poller: Poller,
    auto_motion_prompt: bool,
}

/// Forwards poll progress into the task record.
struct StoreProgress<'a> {
    store: &'a dyn TaskStore,
    task_id: TaskId,
}

#[async_trait]
impl ProgressSink for StoreProgress<'_> {
    async fn on_progress(&mut self, status: &RemoteStatus, elapsed: Duration) {
        let status = status.clone();
        let updated = self
            .store
            .update(
                self.task_id,
                Box::new(move |r: &mut TaskRecord| r.record_poll(&status, elapsed)),
            )
            .await;
        if let Err(err) = updated {
            tracing::debug!(task_id = %self.task_id, error = %err, "progress update dropped");
        }
    }
}

impl TaskRunner {
    pub fn new(
        store: Arc<dyn TaskStore>,
        backend: Arc<dyn VideoBackend>,
        enhancer: Arc<dyn PromptEnhancer>,
        artifacts: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        poller: Poller,
    ) -> Self {
        Self {
            store,
            backend,
            enhancer,
            artifacts,
            clock,
            poller,
            auto_motion_prompt: false,
        }
    }

    /// Let image2video runs without text ask the enhancer for a motion prompt.
    pub fn with_auto_motion_prompt(mut self, enabled: bool) -> Self {
        self.auto_motion_prompt = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Drive one task to a terminal state and persist the result.
    pub async fn run(&self, request: RunRequest) {
        let task_id = request.task_id;
        tracing::info!(task_id = %task_id, mode = %request.mode, phase = "start", "run started");

        match self.execute(&request).await {
            Ok(result) => {
                let now = self.clock.now();
                let completed = self
                    .store
                    .update(
                        task_id,
                        Box::new(move |r: &mut TaskRecord| r.complete(result, now)),
                    )
                    .await;
                match completed {
                    Ok(_) => tracing::info!(task_id = %task_id, phase = "done", "task completed"),
                    Err(err) => {
                        tracing::error!(task_id = %task_id, error = %err, "could not mark task completed");
                        self.mark_failed(task_id, &RunError::Store(err).to_string()).await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, phase = "failed", error = %err, "task failed");
                self.mark_failed(task_id, &err.to_string()).await;
            }
        }

        self.persist().await;
    }

    /// Move `task_id` to failed. Used by the worker when a run panicked too.
    pub async fn fail(&self, task_id: TaskId, message: &str) {
        self.mark_failed(task_id, message).await;
        self.persist().await;
    }

    async fn mark_failed(&self, task_id: TaskId, message: &str) {
        let now = self.clock.now();
        let message = message.to_string();
        let failed = self
            .store
            .update(
                task_id,
                Box::new(move |r: &mut TaskRecord| r.fail(message, now)),
            )
            .await;
        if let Err(err) = failed {
            tracing::error!(task_id = %task_id, error = %err, "could not mark task failed");
        }
    }

    async fn persist(&self) {
        if let Err(err) = self.store.persist().await {
            tracing::error!(error = %err, "failed to write task history");
        }
    }

    async fn set_progress(&self, task_id: TaskId, message: &'static str) -> Result<(), StoreError> {
        self.store
            .update(
                task_id,
                Box::new(move |r: &mut TaskRecord| r.set_progress(message)),
            )
            .await
            .map(|_| ())
    }

    async fn execute(&self, request: &RunRequest) -> Result<TaskResult, RunError> {
        let task_id = request.task_id;
        self.store
            .update(task_id, Box::new(|r: &mut TaskRecord| r.start()))
            .await?;

        let prompt = self.working_prompt(request).await?;

        let content = build_content(request.mode, &prompt, &request.inputs).await?;
        self.set_progress(task_id, mode_progress(request.mode)).await?;

        let job = CreateJobRequest {
            content,
            ratio: request.options.ratio.clone(),
            duration: request.options.duration,
            watermark: request.options.watermark,
        };
        let handle = self.backend.create_job(&job).await?;
        let job_id = handle.as_str().to_string();
        self.store
            .update(
                task_id,
                Box::new(move |r: &mut TaskRecord| r.set_remote_job(job_id)),
            )
            .await?;
        tracing::info!(task_id = %task_id, remote_job_id = %handle, phase = "polling", "remote job created");

        let mut sink = StoreProgress {
            store: self.store.as_ref(),
            task_id,
        };
        let outcome = self
            .poller
            .poll(self.backend.as_ref(), &handle, &mut sink)
            .await?;
        tracing::info!(
            task_id = %task_id,
            remote_job_id = %handle,
            outcome = ?outcome.kind(),
            elapsed_secs = outcome.elapsed().as_secs(),
            "remote job finished"
        );

        let video_url = match outcome {
            PollOutcome::Succeeded { video_url, rule, .. } => {
                tracing::debug!(task_id = %task_id, rule, "video url extracted");
                video_url
            }
            PollOutcome::SucceededNoArtifact { .. } => return Err(RunError::NoArtifact),
            PollOutcome::Failed { error, .. } => return Err(RunError::RemoteFailed(error)),
            PollOutcome::TimedOut { elapsed } => return Err(RunError::TimedOut { elapsed }),
        };

        self.set_progress(task_id, progress::DOWNLOADING).await?;
        let stored = self
            .artifacts
            .fetch(task_id, &video_url)
            .await
            .map_err(RunError::ArtifactFetch)?;

        Ok(TaskResult {
            video_url,
            local_path: stored.local_path.display().to_string(),
            video_filename: stored.filename,
        })
    }

    /// The prompt sent to the backend: enhanced when possible, otherwise the
    /// user's text. Enhancer failures only log.
    async fn working_prompt(&self, request: &RunRequest) -> Result<String, RunError> {
        let task_id = request.task_id;
        let original = request.inputs.text.trim().to_string();
        let options = &request.options;
        if !options.enhance_prompt {
            return Ok(original);
        }

        let enhanced = if !original.is_empty() {
            self.set_progress(task_id, progress::ENHANCING).await?;
            let ask = EnhanceRequest {
                prompt: original.clone(),
                style: options.style.clone(),
                language: options.language.clone(),
            };
            self.enhancer.enhance(&ask).await
        } else if request.mode == GenerationMode::Image2Video && self.auto_motion_prompt {
            self.set_progress(task_id, progress::MOTION).await?;
            self.enhancer.motion_prompt(None, DEFAULT_MOTION_TYPE).await
        } else {
            return Ok(original);
        };

        match enhanced {
            Ok(text) => {
                tracing::info!(task_id = %task_id, phase = "enhance", "prompt enhanced");
                let stored = text.clone();
                self.store
                    .update(
                        task_id,
                        Box::new(move |r: &mut TaskRecord| r.set_enhanced_prompt(stored)),
                    )
                    .await?;
                Ok(text)
            }
            Err(err) => {
                tracing::warn!(task_id = %task_id, phase = "enhance", error = %err, "prompt enhancement failed, using the original prompt");
                Ok(original)
            }
        }
    }
}

fn mode_progress(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Text2Video => progress::TEXT2VIDEO,
        GenerationMode::Image2Video => progress::IMAGE2VIDEO,
        GenerationMode::Edit => progress::EDIT,
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>, RunError> {
    tokio::fs::read(path).await.map_err(|source| RunError::ReadSource {
        path: path.to_path_buf(),
        source,
    })
}

/// Content list for one generation call.
pub async fn build_content(
    mode: GenerationMode,
    prompt: &str,
    inputs: &GenerationInputs,
) -> Result<Vec<ContentItem>, RunError> {
    let mut content = Vec::new();
    match mode {
        GenerationMode::Text2Video => {
            if prompt.is_empty() {
                return Err(RunError::MissingSource("text2video prompt"));
            }
            content.push(ContentItem::text(prompt));
        }
        GenerationMode::Image2Video => {
            let image = inputs
                .image
                .as_ref()
                .ok_or(RunError::MissingSource("image2video image"))?;
            let bytes = read_source(image).await?;
            content.push(ContentItem::image(data_url(image_mime(image), &bytes)));
            if !prompt.is_empty() {
                content.push(ContentItem::text(prompt));
            }
        }
        GenerationMode::Edit => {
            if prompt.is_empty() {
                return Err(RunError::MissingEditInstruction);
            }
            if let Some(video) = &inputs.video {
                let bytes = read_source(video).await?;
                content.push(ContentItem::video(data_url(video_mime(video), &bytes)));
            } else if let Some(image) = &inputs.image {
                let bytes = read_source(image).await?;
                content.push(ContentItem::image(data_url(image_mime(image), &bytes)));
            } else {
                return Err(RunError::MissingSource("edit source"));
            }
            content.push(ContentItem::text(prompt));
        }
    }
    Ok(content)
}
