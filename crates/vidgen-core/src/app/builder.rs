//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装（ports は差し替え可能、未指定なら Settings から既定の実装を作る）
//! - 起動時検証（Fail-fast 設計）: 出力ディレクトリを作れなければ build() が失敗する
//! - 起動時に history.json を読み込み、ワーカープールを起動する

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::domain::{GenerationMode, RemoteError, StoreError, TaskParams, TaskRecord};
use crate::impls::{
    ArkPromptEnhancer, ArkVideoBackend, HttpArtifactStore, JsonFileTaskStore, UploadDir, http,
};
use crate::ports::{
    ArtifactStore, Clock, IdGenerator, PromptEnhancer, SystemClock, TaskStore, UlidGenerator,
    VideoBackend,
};

use super::poller::Poller;
use super::runner::{GenerationInputs, RunOptions, RunRequest, TaskRunner};
use super::worker_pool::{RunSubmitter, SubmitError, WorkerGroup};

const USER_AGENT: &str = concat!("vidgen/", env!("CARGO_PKG_VERSION"));

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(Settings::from_env()?)
///     .video_backend(Arc::new(MyBackend))
///     .build()
///     .await?;
/// ```
pub struct AppBuilder {
    settings: Settings,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    store: Option<Arc<dyn TaskStore>>,
    backend: Option<Arc<dyn VideoBackend>>,
    enhancer: Option<Arc<dyn PromptEnhancer>>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not build the HTTP client: {0}")]
    HttpClient(#[from] RemoteError),
}

/// Why a generation request was not queued.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error(transparent)]
    Queue(#[from] SubmitError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            clock: None,
            ids: None,
            store: None,
            backend: None,
            enhancer: None,
            artifacts: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn video_backend(mut self, backend: Arc<dyn VideoBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn prompt_enhancer(mut self, enhancer: Arc<dyn PromptEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn artifact_store(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// 構築して App を生成（ワーカーも起動する。tokio runtime の中で呼ぶこと）
    ///
    /// # 検証
    /// - videos/ と uploads/ を作成できること
    /// - API キーが無い場合は警告だけ出す（リモート呼び出しが失敗する）
    pub async fn build(self) -> Result<App, BuildError> {
        let settings = self.settings;
        for dir in [settings.videos_dir(), settings.uploads_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| BuildError::CreateDir { path: dir.clone(), source })?;
        }

        let remote_defaults_needed =
            self.backend.is_none() || self.enhancer.is_none() || self.artifacts.is_none();
        if remote_defaults_needed && settings.api_key.is_none() {
            tracing::warn!("ARK_API_KEY is not set; generation requests will fail");
        }
        let client = http::client(USER_AGENT)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        let store: Arc<dyn TaskStore> = match self.store {
            Some(store) => store,
            None => Arc::new(JsonFileTaskStore::open(settings.history_file(), clock.clone()).await),
        };

        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(ArkVideoBackend::new(
                client.clone(),
                settings.base_url.clone(),
                settings.video_model.clone(),
                settings.api_key.clone(),
            ))
        });
        let enhancer = self.enhancer.unwrap_or_else(|| {
            Arc::new(ArkPromptEnhancer::new(
                client.clone(),
                settings.base_url.clone(),
                settings.llm_model.clone(),
                settings.api_key.clone(),
            ))
        });
        let artifacts = self.artifacts.unwrap_or_else(|| {
            Arc::new(HttpArtifactStore::new(
                client,
                settings.videos_dir(),
                settings.download_timeout,
            ))
        });

        let runner = TaskRunner::new(
            store.clone(),
            backend,
            enhancer,
            artifacts,
            clock.clone(),
            Poller::new(settings.poll_interval, settings.max_poll_time),
        )
        .with_auto_motion_prompt(settings.auto_motion_prompt);
        let (workers, submitter) =
            WorkerGroup::spawn(settings.workers, settings.queue_capacity, Arc::new(runner));

        let uploads = Arc::new(UploadDir::new(settings.uploads_dir(), ids.clone()));
        Ok(App {
            handle: AppHandle {
                settings: Arc::new(settings),
                store,
                ids,
                clock,
                uploads,
                submitter,
            },
            workers,
        })
    }
}

/// Cheap, cloneable view of a running app (what HTTP handlers hold).
#[derive(Clone)]
pub struct AppHandle {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn TaskStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub uploads: Arc<UploadDir>,
    submitter: RunSubmitter,
}

impl AppHandle {
    /// Create a pending record and queue its run. The queue slot is taken
    /// first, so a full queue leaves no record behind.
    pub async fn enqueue(
        &self,
        mode: GenerationMode,
        inputs: GenerationInputs,
        options: RunOptions,
    ) -> Result<TaskRecord, EnqueueError> {
        let slot = self.submitter.reserve()?;

        let params = TaskParams {
            mode,
            prompt: inputs.text.clone(),
            ratio: options.ratio.clone(),
            duration: options.duration,
            watermark: options.watermark,
            enhance_prompt: options.enhance_prompt,
        };
        let record = TaskRecord::new(self.ids.generate_task_id(), params, self.clock.now());
        let record = self.store.create(record).await?;

        slot.submit(RunRequest {
            task_id: record.id,
            mode,
            inputs,
            options,
        });
        tracing::info!(task_id = %record.id, mode = %mode, phase = "queued", "task queued");
        Ok(record)
    }

    pub fn queue_available(&self) -> usize {
        self.submitter.available()
    }
}

pub struct App {
    pub handle: AppHandle,
    workers: WorkerGroup,
}

impl App {
    /// Stop taking runs, wait up to `grace` for in-flight ones, then write
    /// the history one last time. Returns false if the wait timed out.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let App { handle, workers } = self;
        let drained = tokio::time::timeout(grace, workers.shutdown_and_join())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(grace_secs = grace.as_secs(), "in-flight runs did not finish in time");
        }
        if let Err(err) = handle.store.persist().await {
            tracing::error!(error = %err, "failed to write task history on shutdown");
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{FakeArtifacts, FakeEnhancer, ScriptedBackend};
    use crate::domain::TaskStatus;
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn settings(dir: &TempDir, queue: &str) -> Settings {
        let vars: HashMap<&str, String> = HashMap::from([
            ("VIDGEN_OUTPUT_DIR", dir.path().join("out").display().to_string()),
            ("VIDGEN_WORKERS", "1".to_string()),
            ("VIDGEN_QUEUE_CAPACITY", queue.to_string()),
        ]);
        Settings::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    fn builder(dir: &TempDir, queue: &str) -> AppBuilder {
        let backend = ScriptedBackend::new(vec![json!({"status": "failed", "error": "nope"})]);
        AppBuilder::new(settings(dir, queue))
            .video_backend(Arc::new(backend))
            .prompt_enhancer(Arc::new(FakeEnhancer::failing()))
            .artifact_store(Arc::new(FakeArtifacts::new(dir.path().join("out/videos"))))
    }

    fn options() -> RunOptions {
        RunOptions {
            ratio: "16:9".to_string(),
            duration: 5,
            watermark: false,
            enhance_prompt: false,
            style: "cinematic".to_string(),
            language: "English".to_string(),
        }
    }

    #[tokio::test]
    async fn build_creates_output_layout() {
        let dir = TempDir::new().unwrap();
        let app = builder(&dir, "4").build().await.unwrap();

        assert!(dir.path().join("out/videos").is_dir());
        assert!(dir.path().join("out/uploads").is_dir());
        assert!(app.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn build_fails_when_output_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("out"), b"not a dir").unwrap();

        let err = builder(&dir, "4").build().await.err().unwrap();
        assert!(matches!(err, BuildError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn enqueue_creates_pending_record() {
        let dir = TempDir::new().unwrap();
        let app = builder(&dir, "4").build().await.unwrap();

        let record = app
            .handle
            .enqueue(
                GenerationMode::Text2Video,
                GenerationInputs {
                    text: "a cat".to_string(),
                    ..Default::default()
                },
                options(),
            )
            .await
            .unwrap();

        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.params.prompt, "a cat");
        assert!(app.handle.store.get(record.id).await.is_ok());
        assert!(app.shutdown(Duration::from_secs(5)).await);
        // failed either by the scripted backend or by the shutdown drain
        let finished = app_store_status(&dir, record.id).await;
        assert_eq!(finished, TaskStatus::Failed);
    }

    async fn app_store_status(dir: &TempDir, id: crate::domain::TaskId) -> TaskStatus {
        let store = JsonFileTaskStore::new(
            dir.path().join("out/history.json"),
            Arc::new(SystemClock),
        );
        store.restore().await.unwrap();
        store.get(id).await.unwrap().status
    }

    #[tokio::test]
    async fn shutdown_persists_history() {
        let dir = TempDir::new().unwrap();
        let app = builder(&dir, "4").build().await.unwrap();
        app.shutdown(Duration::from_secs(1)).await;
        assert!(dir.path().join("out/history.json").exists());
    }
}
