#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use vidgen_core::app::{App, AppBuilder};
use vidgen_core::config::Settings;
use vidgen_core::domain::{ArtifactError, RemoteError, RemoteStatus, TaskId};
use vidgen_core::ports::{
    ArtifactStore, CreateJobRequest, EnhanceRequest, JobHandle, JobSnapshot, PromptEnhancer,
    StoredArtifact, VideoBackend,
};
use vidgen_server::config::ServerConfig;
use vidgen_server::router::build_app_router;
use vidgen_server::state::AppState;

pub const BOUNDARY: &str = "vidgen-test-boundary";

/// Backend whose jobs finish on the first status query with `body`.
pub struct StubBackend {
    status: RemoteStatus,
    body: Value,
    pub created: Mutex<Vec<CreateJobRequest>>,
}

impl StubBackend {
    pub fn succeeding() -> Self {
        Self {
            status: RemoteStatus::Succeeded,
            body: json!({"status": "succeeded", "content": {"video_url": "https://cdn.test/out.mp4"}}),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            status: RemoteStatus::Failed,
            body: json!({"status": "failed", "error": {"code": "Blocked", "message": "policy"}}),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Never finishes; runs stay in `processing` until shutdown.
    pub fn stalled() -> Self {
        Self {
            status: RemoteStatus::Running,
            body: json!({"status": "running"}),
            created: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoBackend for StubBackend {
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobHandle, RemoteError> {
        self.created.lock().unwrap().push(request.clone());
        Ok(JobHandle::new("cgt-integration"))
    }

    async fn get_job(&self, _handle: &JobHandle) -> Result<JobSnapshot, RemoteError> {
        Ok(JobSnapshot::new(self.status.clone(), self.body.clone()))
    }
}

/// Enhancer that echoes the prompt with a suffix.
pub struct EchoEnhancer;

#[async_trait]
impl PromptEnhancer for EchoEnhancer {
    async fn enhance(&self, request: &EnhanceRequest) -> Result<String, RemoteError> {
        Ok(format!("{}, golden hour", request.prompt))
    }

    async fn motion_prompt(
        &self,
        _description: Option<&str>,
        _motion_type: &str,
    ) -> Result<String, RemoteError> {
        Ok("slow pan".to_string())
    }
}

/// Writes a few bytes instead of downloading.
pub struct LocalArtifacts {
    pub dir: PathBuf,
}

#[async_trait]
impl ArtifactStore for LocalArtifacts {
    async fn fetch(&self, task_id: TaskId, _url: &str) -> Result<StoredArtifact, ArtifactError> {
        let filename = format!("video_{task_id}.mp4");
        let local_path = self.dir.join(&filename);
        tokio::fs::write(&local_path, b"fake-mp4-bytes")
            .await
            .map_err(|source| ArtifactError::Io {
                path: local_path.clone(),
                source,
            })?;
        Ok(StoredArtifact {
            local_path,
            filename,
        })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        max_upload_bytes: 1024 * 1024,
        shutdown_timeout_secs: 1,
    }
}

pub struct TestApp {
    pub router: Router,
    pub app: App,
    pub backend: Arc<StubBackend>,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn start(backend: StubBackend) -> Self {
        Self::start_with(backend, 2, 16, 0).await
    }

    pub async fn start_with(
        backend: StubBackend,
        workers: usize,
        queue: usize,
        poll_secs: u64,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out");
        let vars = [
            ("VIDGEN_OUTPUT_DIR", output.display().to_string()),
            ("VIDGEN_POLL_INTERVAL_SECS", poll_secs.to_string()),
            ("VIDGEN_WORKERS", workers.to_string()),
            ("VIDGEN_QUEUE_CAPACITY", queue.to_string()),
        ];
        let settings = Settings::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap();

        let backend = Arc::new(backend);
        let app = AppBuilder::new(settings)
            .video_backend(backend.clone())
            .prompt_enhancer(Arc::new(EchoEnhancer))
            .artifact_store(Arc::new(LocalArtifacts {
                dir: output.join("videos"),
            }))
            .build()
            .await
            .unwrap();

        let config = test_config();
        let state = AppState {
            app: app.handle.clone(),
            config: Arc::new(config.clone()),
        };
        Self {
            router: build_app_router(state, &config),
            app,
            backend,
            dir,
        }
    }

    pub fn history_file(&self) -> PathBuf {
        self.dir.path().join("out/history.json")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST /api/upload with a `type` field and a `file` part.
    pub async fn upload(&self, kind: &str, filename: &str, bytes: &[u8]) -> Response<Body> {
        let request = Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(Some(kind), Some((filename, bytes)))))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_multipart(&self, body: Vec<u8>) -> Response<Body> {
        let request = Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Poll the status endpoint until the task is terminal.
    pub async fn wait_terminal(&self, task_id: &str) -> Value {
        for _ in 0..200 {
            let response = self.get(&format!("/api/status/{task_id}")).await;
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            if json["status"] == "completed" || json["status"] == "failed" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} did not finish");
    }

    /// Wait until history.json holds `task_id` in a terminal status.
    pub async fn wait_persisted(&self, task_id: &str) -> Vec<u8> {
        for _ in 0..200 {
            if let Ok(bytes) = std::fs::read(self.history_file()) {
                if let Ok(history) = serde_json::from_slice::<Value>(&bytes) {
                    let status = &history[task_id]["status"];
                    if status == "completed" || status == "failed" {
                        return bytes;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {task_id} was not written to history");
    }

    pub async fn task_count(&self) -> usize {
        let response = self.get("/api/tasks").await;
        body_json(response).await.as_array().unwrap().len()
    }
}

pub fn multipart_body(kind: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(kind) = kind {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
