//! Errors - エラー型と分類
//!
//! 失敗の種類ごとに enum を分けています。
//! - TransitionError: TaskRecord の不正な状態遷移
//! - StoreError: TaskStore（メモリ + history.json）
//! - RemoteError: 外部 API（動画生成 / プロンプト強化）
//! - ArtifactError: 生成された動画のダウンロード
//! - UploadError: アップロードファイルの保存・解決
//! - RunError: TaskRunner が task を failed にする理由

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::ids::TaskId;
use super::state::TaskStatus;
use super::upload::UploadKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task_id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {0} already exists")]
    AlreadyExists(TaskId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure talking to one of the remote AI APIs.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network, DNS, TLS, timeout...
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx answer.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// 2xx answer we could not understand.
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("download failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file type for {kind}. Allowed: {allowed}")]
    DisallowedExtension { kind: UploadKind, allowed: String },

    #[error("invalid file id {0:?}")]
    InvalidId(String),

    #[error("could not store upload at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a run ended in `failed`. The `Display` text becomes the task's `error`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("video backend request failed: {0}")]
    Backend(#[from] RemoteError),

    #[error("video generation failed: {0}")]
    RemoteFailed(String),

    #[error("video generation timed out after {}s", .elapsed.as_secs())]
    TimedOut { elapsed: Duration },

    #[error("video generation succeeded but the backend returned no video URL")]
    NoArtifact,

    #[error("video generation succeeded but saving the video failed: {0}")]
    ArtifactFetch(#[source] ArtifactError),

    #[error("an edit instruction is required for edit mode")]
    MissingEditInstruction,

    #[error("no source file for {0}")]
    MissingSource(&'static str),

    #[error("could not read source file {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task store error: {0}")]
    Store(#[from] StoreError),
}
