//! WorkerPool - 有界キュー + 固定数のワーカー
//!
//! - RunSubmitter::reserve() でキューの枠を先に確保する。
//!   満杯なら task を作る前に断れる（HTTP では 503）
//! - 各 run は tokio::spawn で別タスクにする。panic は JoinError として
//!   受け取り、task を failed にする
//! - shutdown 後は新しい run を取らない。実行中の run は最後まで走る。
//!   キューに残っていたものは failed にする

use std::any::Any;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::runner::{RunRequest, TaskRunner};

pub const SHUTDOWN_ERROR: &str = "server shut down before this task started";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("the run queue is full, try again later")]
    Full,
    #[error("the worker pool is shutting down")]
    Closed,
}

/// A reserved queue slot. Dropping it gives the slot back.
pub struct RunSlot {
    permit: mpsc::OwnedPermit<RunRequest>,
}

impl RunSlot {
    pub fn submit(self, request: RunRequest) {
        self.permit.send(request);
    }
}

/// Cloneable handle for feeding the pool.
#[derive(Clone)]
pub struct RunSubmitter {
    tx: mpsc::Sender<RunRequest>,
}

impl RunSubmitter {
    pub fn reserve(&self) -> Result<RunSlot, SubmitError> {
        match self.tx.clone().try_reserve_owned() {
            Ok(permit) => Ok(RunSlot { permit }),
            Err(TrySendError::Full(_)) => Err(SubmitError::Full),
            Err(TrySendError::Closed(_)) => Err(SubmitError::Closed),
        }
    }

    /// Free queue slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

/// Worker group handle.
/// - `request_shutdown()` で新しい run の受付を止める
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `workers` workers behind a queue of `capacity` runs.
    pub fn spawn(
        workers: usize,
        capacity: usize,
        runner: Arc<TaskRunner>,
    ) -> (Self, RunSubmitter) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers.max(1) {
            let q = Arc::clone(&queue);
            let r = Arc::clone(&runner);
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, q, r, &mut rx).await;
            }));
        }
        tracing::info!(workers = joins.len(), capacity, "worker pool started");

        (Self { shutdown_tx, joins }, RunSubmitter { tx })
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for every in-flight run.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<RunRequest>>>,
    runner: Arc<TaskRunner>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let next = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = async { queue.lock().await.recv().await } => next,
        };

        // every sender is gone
        let Some(request) = next else {
            break;
        };

        execute(worker_id, &runner, request).await;
    }

    drain(&queue, &runner).await;
    tracing::debug!(worker_id, "worker stopped");
}

async fn execute(worker_id: usize, runner: &Arc<TaskRunner>, request: RunRequest) {
    let task_id = request.task_id;
    let span = tracing::info_span!("run", task_id = %task_id, worker_id);
    let r = Arc::clone(runner);
    let handle = tokio::spawn(async move { r.run(request).await }.instrument(span));

    if let Err(err) = handle.await {
        let reason = if err.is_panic() {
            panic_message(err.into_panic())
        } else {
            "run was cancelled".to_string()
        };
        tracing::error!(task_id = %task_id, worker_id, reason = %reason, "run aborted");
        runner
            .fail(task_id, &format!("internal error: {reason}"))
            .await;
    }
}

/// Close the queue and fail whatever never started.
async fn drain(queue: &Mutex<mpsc::Receiver<RunRequest>>, runner: &TaskRunner) {
    let mut rx = queue.lock().await;
    rx.close();
    while let Ok(request) = rx.try_recv() {
        tracing::warn!(task_id = %request.task_id, "dropping queued run on shutdown");
        runner.fail(request.task_id, SHUTDOWN_ERROR).await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::poller::Poller;
    use crate::app::runner::{GenerationInputs, RunOptions};
    use crate::app::testing::{FakeArtifacts, FakeEnhancer, ScriptedBackend};
    use crate::domain::task::tests::sample_params;
    use crate::domain::{GenerationMode, RemoteError, TaskId, TaskRecord, TaskStatus};
    use crate::impls::JsonFileTaskStore;
    use crate::ports::{
        Clock, CreateJobRequest, JobHandle, JobSnapshot, SystemClock, TaskStore, VideoBackend,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use ulid::Ulid;

    struct PanickingBackend;

    #[async_trait]
    impl VideoBackend for PanickingBackend {
        async fn create_job(&self, _request: &CreateJobRequest) -> Result<JobHandle, RemoteError> {
            panic!("backend exploded");
        }

        async fn get_job(&self, _handle: &JobHandle) -> Result<JobSnapshot, RemoteError> {
            unreachable!()
        }
    }

    fn runner(dir: &TempDir, backend: Arc<dyn VideoBackend>) -> (Arc<TaskRunner>, Arc<JsonFileTaskStore>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(JsonFileTaskStore::new(dir.path().join("history.json"), clock.clone()));
        let runner = TaskRunner::new(
            store.clone(),
            backend,
            Arc::new(FakeEnhancer::failing()),
            Arc::new(FakeArtifacts::new(dir.path().join("videos"))),
            clock,
            Poller::new(Duration::from_millis(1), Duration::from_secs(5)),
        );
        (Arc::new(runner), store)
    }

    async fn request(store: &JsonFileTaskStore) -> RunRequest {
        let record = TaskRecord::new(TaskId::from_ulid(Ulid::new()), sample_params(), Utc::now());
        let task_id = record.id;
        store.create(record).await.unwrap();
        RunRequest {
            task_id,
            mode: GenerationMode::Text2Video,
            inputs: GenerationInputs {
                text: "a cat".to_string(),
                ..Default::default()
            },
            options: RunOptions {
                ratio: "16:9".to_string(),
                duration: 5,
                watermark: false,
                enhance_prompt: false,
                style: "cinematic".to_string(),
                language: "English".to_string(),
            },
        }
    }

    async fn wait_terminal(store: &JsonFileTaskStore, id: TaskId) -> TaskRecord {
        for _ in 0..500 {
            let record = store.get(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {id} never finished");
    }

    #[tokio::test]
    async fn runs_submitted_work() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(ScriptedBackend::new(vec![
            json!({"status": "succeeded", "video_url": "https://cdn/1.mp4"}),
            json!({"status": "succeeded", "video_url": "https://cdn/2.mp4"}),
            json!({"status": "succeeded", "video_url": "https://cdn/3.mp4"}),
        ]));
        let (runner, store) = runner(&dir, backend);
        let (group, submitter) = WorkerGroup::spawn(2, 8, runner);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let req = request(&store).await;
            ids.push(req.task_id);
            submitter.reserve().unwrap().submit(req);
        }
        for id in ids {
            assert_eq!(wait_terminal(&store, id).await.status, TaskStatus::Completed);
        }

        group.shutdown_and_join().await;
        assert_eq!(submitter.reserve().err(), Some(SubmitError::Closed));
    }

    #[tokio::test]
    async fn full_queue_is_reported_before_any_task_exists() {
        let dir = TempDir::new().unwrap();
        let (runner, _store) = runner(&dir, Arc::new(ScriptedBackend::new(vec![])));
        let (group, submitter) = WorkerGroup::spawn(1, 1, runner);

        let held = submitter.reserve().unwrap();
        assert_eq!(submitter.reserve().err(), Some(SubmitError::Full));
        drop(held);
        assert!(submitter.reserve().is_ok());

        group.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn panicking_run_marks_task_failed() {
        let dir = TempDir::new().unwrap();
        let (runner, store) = runner(&dir, Arc::new(PanickingBackend));
        let (group, submitter) = WorkerGroup::spawn(1, 4, runner);

        let req = request(&store).await;
        let id = req.task_id;
        submitter.reserve().unwrap().submit(req);

        let record = wait_terminal(&store, id).await;
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("internal error: backend exploded"));

        // the worker survived and still takes work
        let req = request(&store).await;
        let id = req.task_id;
        submitter.reserve().unwrap().submit(req);
        assert_eq!(wait_terminal(&store, id).await.status, TaskStatus::Failed);

        group.shutdown_and_join().await;
    }

    #[test]
    fn panic_payloads_become_text() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42u8)), "panic");
    }
}
