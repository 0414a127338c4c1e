//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Poller**: リモートジョブの完了待ち（間隔 + 締め切り）
//! - **TaskRunner**: 1 task を pending → processing → completed/failed まで動かす
//! - **WorkerGroup**: 有界キューから run を取り出すワーカープール
//! - **Status**: /health 用のサマリ

pub mod builder;
pub mod poller;
pub mod runner;
pub mod status;
pub mod worker_pool;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, AppHandle, BuildError, EnqueueError};
pub use self::poller::{IgnoreProgress, Poller, ProgressSink};
pub use self::runner::{GenerationInputs, RunOptions, RunRequest, TaskRunner};
pub use self::status::HealthReport;
pub use self::worker_pool::{RunSlot, RunSubmitter, SubmitError, WorkerGroup};
