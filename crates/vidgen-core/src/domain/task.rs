//! Task record: request snapshot + lifecycle state.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TransitionError;
use super::ids::TaskId;
use super::state::{RemoteStatus, TaskStatus};

/// Which kind of generation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Text2Video,
    Image2Video,
    Edit,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Text2Video => "text2video",
            GenerationMode::Image2Video => "image2video",
            GenerationMode::Edit => "edit",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown generation mode {0:?} (expected text2video, image2video or edit)")]
pub struct UnknownModeError(pub String);

impl FromStr for GenerationMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text2video" => Ok(GenerationMode::Text2Video),
            "image2video" => Ok(GenerationMode::Image2Video),
            "edit" => Ok(GenerationMode::Edit),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// Snapshot of the request that created a task. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskParams {
    pub mode: GenerationMode,
    /// The prompt exactly as the user sent it (before enhancement).
    pub prompt: String,
    pub ratio: String,
    pub duration: u32,
    #[serde(default)]
    pub watermark: bool,
    #[serde(default = "default_true")]
    pub enhance_prompt: bool,
}

fn default_true() -> bool {
    true
}

/// Where the finished video ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Remote artifact URL as reported by the backend.
    pub video_url: String,
    pub local_path: String,
    pub video_filename: String,
}

/// Progress messages shown to the user while a task runs.
pub mod progress {
    pub const STARTING: &str = "Starting...";
    pub const INITIALIZING: &str = "Initializing...";
    pub const ENHANCING: &str = "Enhancing prompt with AI...";
    pub const MOTION: &str = "Writing a motion prompt with AI...";
    pub const TEXT2VIDEO: &str = "Generating video from text...";
    pub const IMAGE2VIDEO: &str = "Generating video from image...";
    pub const EDIT: &str = "Editing video...";
    pub const DOWNLOADING: &str = "Downloading video...";
    pub const DONE: &str = "Done!";
    pub const FAILED: &str = "Failed";
}

/// Metadata + lifecycle of one generation task.
///
/// Design:
/// - This is the "single source of truth" for task state (held by a `TaskStore`).
/// - All state transitions happen through the methods below; they refuse to
///   touch a record that already reached a terminal status.
/// - `result` is only ever set together with `Completed`, `error` only with `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub progress: String,
    pub params: TaskParams,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,

    /// Seconds since polling started, as last reported by the poller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,

    /// Handle of the remote generation job once it was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_job_id: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(id: TaskId, params: TaskParams, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            progress: progress::STARTING.to_string(),
            params,
            enhanced_prompt: None,
            elapsed: None,
            remote_job_id: None,
            created_at,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    fn ensure_live(&self, to: TaskStatus) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError {
                task_id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    /// Pending -> Processing.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.status != TaskStatus::Pending {
            return Err(TransitionError {
                task_id: self.id,
                from: self.status,
                to: TaskStatus::Processing,
            });
        }
        self.status = TaskStatus::Processing;
        self.progress = progress::INITIALIZING.to_string();
        Ok(())
    }

    pub fn set_progress(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_live(self.status)?;
        self.progress = message.into();
        Ok(())
    }

    /// Progress forwarded from the poller.
    pub fn record_poll(
        &mut self,
        status: &RemoteStatus,
        elapsed: Duration,
    ) -> Result<(), TransitionError> {
        self.ensure_live(self.status)?;
        let secs = elapsed.as_secs_f64();
        self.progress = format!("Status: {status} ({secs:.0}s)");
        self.elapsed = Some(secs);
        Ok(())
    }

    pub fn set_enhanced_prompt(&mut self, prompt: String) -> Result<(), TransitionError> {
        self.ensure_live(self.status)?;
        self.enhanced_prompt = Some(prompt);
        Ok(())
    }

    pub fn set_remote_job(&mut self, job_id: String) -> Result<(), TransitionError> {
        self.ensure_live(self.status)?;
        self.remote_job_id = Some(job_id);
        Ok(())
    }

    /// Processing -> Completed.
    pub fn complete(
        &mut self,
        result: TaskResult,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TransitionError {
                task_id: self.id,
                from: self.status,
                to: TaskStatus::Completed,
            });
        }
        self.status = TaskStatus::Completed;
        self.progress = progress::DONE.to_string();
        self.completed_at = Some(now);
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    /// Pending/Processing -> Failed.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_live(TaskStatus::Failed)?;
        self.status = TaskStatus::Failed;
        self.progress = progress::FAILED.to_string();
        self.completed_at = Some(now);
        self.error = Some(error.into());
        self.result = None;
        Ok(())
    }
}
