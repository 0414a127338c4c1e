//! Fake ports shared by the app tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::{ArtifactError, RemoteError, TaskId};
use crate::impls::ark_video::parse_snapshot;
use crate::impls::http_artifact::artifact_filename;
use crate::ports::{
    ArtifactStore, CreateJobRequest, EnhanceRequest, JobHandle, JobSnapshot, PromptEnhancer,
    StoredArtifact, VideoBackend,
};

/// Answers `get_job` from a script of raw status bodies, then "running".
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Value>>,
    get_calls: AtomicUsize,
    fail_get_after: Mutex<Option<usize>>,
    fail_create: Mutex<Option<RemoteError>>,
    created: Mutex<Vec<CreateJobRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new(script: Vec<Value>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            get_calls: AtomicUsize::new(0),
            fail_get_after: Mutex::new(None),
            fail_create: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Every `get_job` from call number `n` (0-based) on fails.
    pub(crate) fn fail_get_after(&self, n: usize) {
        *self.fail_get_after.lock().unwrap() = Some(n);
    }

    pub(crate) fn fail_create_with(&self, err: RemoteError) {
        *self.fail_create.lock().unwrap() = Some(err);
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn created(&self) -> Vec<CreateJobRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoBackend for ScriptedBackend {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobHandle, RemoteError> {
        if let Some(err) = self.fail_create.lock().unwrap().take() {
            return Err(err);
        }
        self.created.lock().unwrap().push(request.clone());
        Ok(JobHandle::new("cgt-test"))
    }

    async fn get_job(&self, _handle: &JobHandle) -> Result<JobSnapshot, RemoteError> {
        let n = self.get_calls.fetch_add(1, Ordering::SeqCst);
        if matches!(*self.fail_get_after.lock().unwrap(), Some(limit) if n >= limit) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        let body = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"status": "running"}));
        parse_snapshot(body)
    }
}

/// Enhancer that answers with fixed text, or fails.
pub(crate) struct FakeEnhancer {
    answer: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeEnhancer {
    pub(crate) fn answering(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `enhance:<prompt>` or `motion:<type>` per call.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self) -> Result<String, RemoteError> {
        self.answer.clone().ok_or(RemoteError::Api {
            status: 500,
            body: "llm down".to_string(),
        })
    }
}

#[async_trait]
impl PromptEnhancer for FakeEnhancer {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("enhance:{}", request.prompt));
        self.answer()
    }

    async fn motion_prompt(
        &self,
        _description: Option<&str>,
        motion_type: &str,
    ) -> Result<String, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("motion:{motion_type}"));
        self.answer()
    }
}

/// Pretends to download into `dir`; optionally fails.
pub(crate) struct FakeArtifacts {
    dir: PathBuf,
    fail: bool,
    fetched: Mutex<Vec<String>>,
}

impl FakeArtifacts {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fail: false,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(dir: impl Into<PathBuf>) -> Self {
        Self {
            fail: true,
            ..Self::new(dir)
        }
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifacts {
    async fn fetch(&self, task_id: TaskId, url: &str) -> Result<StoredArtifact, ArtifactError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(ArtifactError::Remote(RemoteError::Api {
                status: 403,
                body: "link expired".to_string(),
            }));
        }
        let filename = artifact_filename(task_id, "mp4");
        Ok(StoredArtifact {
            local_path: self.dir.join(&filename),
            filename,
        })
    }
}
