//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（動画生成 API, LLM, ファイルシステム）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore が task 状態の正本
//! - 外部 API はリクエスト/レスポンスだけ。リトライもポーリングもしない
//! - テストでは fake 実装に差し替える

pub mod artifact_store;
pub mod clock;
pub mod id_generator;
pub mod prompt_enhancer;
pub mod task_store;
pub mod video_backend;

pub use self::artifact_store::{ArtifactStore, StoredArtifact};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::prompt_enhancer::{EnhanceRequest, PromptEnhancer};
pub use self::task_store::{TaskCounts, TaskMutation, TaskStore};
pub use self::video_backend::{CreateJobRequest, JobHandle, JobSnapshot, VideoBackend};
