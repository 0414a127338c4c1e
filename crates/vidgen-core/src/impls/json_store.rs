//! JsonFileTaskStore - メモリ上の map + history.json
//!
//! # 実装詳細
//! - RwLock<HashMap<TaskId, TaskRecord>> が正本
//! - update は write lock の中でクローンに適用し、成功したときだけ差し替える
//! - persist は writer ロックを取ってからスナップショットを取る
//!   （古いスナップショットが新しいものを上書きしない）
//! - 書き込みは `history.json.tmp` → rename でアトミックに置き換える
//!
//! ロックを握ったままファイル I/O を await しないこと。

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{StoreError, TaskId, TaskRecord};
use crate::ports::{Clock, TaskCounts, TaskMutation, TaskStore};

pub const INTERRUPTED_ERROR: &str = "interrupted: the server restarted before this task finished";

pub struct JsonFileTaskStore {
    path: PathBuf,
    records: RwLock<HashMap<TaskId, TaskRecord>>,
    /// Serializes snapshot + write so files land in snapshot order.
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl JsonFileTaskStore {
    /// Empty store backed by `path`. Nothing is read until `restore()`.
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            records: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
            clock,
        }
    }

    /// Build the store and load the snapshot. A broken snapshot is logged and
    /// the store starts empty.
    pub async fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let store = Self::new(path, clock);
        match store.restore().await {
            Ok(loaded) => {
                tracing::info!(path = %store.path.display(), loaded, "task history loaded");
            }
            Err(err) => {
                tracing::warn!(
                    path = %store.path.display(),
                    error = %err,
                    "failed to load task history, starting empty"
                );
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Keep an unreadable snapshot around instead of overwriting it on the
    /// next persist.
    async fn quarantine(&self) {
        let stamp = self.clock.now().format("%Y%m%dT%H%M%S");
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{stamp}"));
        let target = self.path.with_file_name(name);
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => tracing::warn!(moved_to = %target.display(), "kept unreadable task history"),
            Err(err) => tracing::warn!(error = %err, "could not move unreadable task history aside"),
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn create(&self, record: TaskRecord) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        let records = self.records.read().await;
        records.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update(
        &self,
        id: TaskId,
        mutation: TaskMutation<'_>,
    ) -> Result<TaskRecord, StoreError> {
        let mut records = self.records.write().await;
        let slot = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let mut next = slot.clone();
        mutation(&mut next)?;
        *slot = next.clone();
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<TaskRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn counts(&self) -> Result<TaskCounts, StoreError> {
        let records = self.records.read().await;
        let mut counts = TaskCounts::default();
        for record in records.values() {
            counts.add(record.status);
        }
        Ok(counts)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;

        let bytes = {
            let records = self.records.read().await;
            let ordered: BTreeMap<&TaskId, &TaskRecord> = records.iter().collect();
            serde_json::to_vec_pretty(&ordered)?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_err(parent, e))?;
        }
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.io_err(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "task history written");
        Ok(())
    }

    async fn restore(&self) -> Result<usize, StoreError> {
        let loaded = {
            let _writer = self.writer.lock().await;
            match tokio::fs::read(&self.path).await {
                Ok(bytes) => serde_json::from_slice::<HashMap<TaskId, TaskRecord>>(&bytes)
                    .map_err(StoreError::from),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
                Err(err) => Err(self.io_err(&self.path, err)),
            }
        };

        let mut loaded = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                self.records.write().await.clear();
                if matches!(err, StoreError::Serde(_)) {
                    self.quarantine().await;
                }
                return Err(err);
            }
        };

        // Runners do not survive a restart; nothing would ever finish these.
        let now = self.clock.now();
        let mut interrupted = 0usize;
        for record in loaded.values_mut() {
            if !record.status.is_terminal() {
                record.fail(INTERRUPTED_ERROR, now)?;
                interrupted += 1;
            }
        }
        if interrupted > 0 {
            tracing::warn!(interrupted, "marked unfinished tasks from the previous run as failed");
        }

        let count = loaded.len();
        *self.records.write().await = loaded;
        Ok(count)
    }
}
