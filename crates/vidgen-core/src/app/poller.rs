//! Poller - リモートジョブが終わるまで一定間隔で問い合わせる
//!
//! # ループ
//! 1. 経過時間が max_wait 以上なら TimedOut
//! 2. get_job（エラーはそのまま返す。リトライしない）
//! 3. succeeded → 抽出ルールで URL を探す / failed → エラーテキスト
//! 4. それ以外 → on_progress を呼んで interval だけ sleep
//!
//! 経過時間は tokio::time::Instant で測る（テストでは時間を止められる）。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::{PollOutcome, RemoteError, RemoteStatus};
use crate::ports::{JobHandle, VideoBackend};

/// Receives every non-terminal status the poller sees.
#[async_trait]
pub trait ProgressSink: Send {
    async fn on_progress(&mut self, status: &RemoteStatus, elapsed: Duration);
}

/// Sink that drops everything.
pub struct IgnoreProgress;

#[async_trait]
impl ProgressSink for IgnoreProgress {
    async fn on_progress(&mut self, _status: &RemoteStatus, _elapsed: Duration) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    max_wait: Duration,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(600))
    }
}

impl Poller {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub async fn poll(
        &self,
        backend: &dyn VideoBackend,
        handle: &JobHandle,
        sink: &mut dyn ProgressSink,
    ) -> Result<PollOutcome, RemoteError> {
        let started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                tracing::warn!(remote_job_id = %handle, elapsed_secs = elapsed.as_secs(), "poll deadline reached");
                return Ok(PollOutcome::TimedOut { elapsed });
            }

            let snapshot = backend.get_job(handle).await?;
            let elapsed = started.elapsed();

            match snapshot.status {
                RemoteStatus::Succeeded => {
                    return Ok(match snapshot.video_url() {
                        Some(found) => PollOutcome::Succeeded {
                            video_url: found.value,
                            rule: found.rule,
                            elapsed,
                        },
                        None => {
                            tracing::warn!(remote_job_id = %handle, body = %snapshot.body, "job succeeded without a video url");
                            PollOutcome::SucceededNoArtifact { elapsed }
                        }
                    });
                }
                RemoteStatus::Failed => {
                    return Ok(PollOutcome::Failed {
                        error: snapshot.error_text(),
                        elapsed,
                    });
                }
                ref status => {
                    tracing::debug!(remote_job_id = %handle, status = %status, elapsed_secs = elapsed.as_secs(), "job still in progress");
                    sink.on_progress(status, elapsed).await;
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}
