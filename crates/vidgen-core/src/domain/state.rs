//! Local task status and remote job status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Local task status.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed
/// - Pending -> Failed (runner could not start, or restart reconciliation)
///
/// Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker.
    Pending,

    /// A runner owns the task.
    Processing,

    /// Video downloaded, `result` is set.
    Completed,

    /// Gave up, `error` is set.
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported by the remote generation backend.
///
/// Only `Succeeded` and `Failed` are terminal. Anything the backend invents
/// beyond the known values is kept verbatim and polled like `Running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Succeeded | RemoteStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::Queued => "queued",
            RemoteStatus::Running => "running",
            RemoteStatus::Succeeded => "succeeded",
            RemoteStatus::Failed => "failed",
            RemoteStatus::Other(s) => s,
        }
    }
}

impl From<&str> for RemoteStatus {
    fn from(s: &str) -> Self {
        match s {
            // the backend says "queuing" in some API versions
            "queued" | "queuing" => RemoteStatus::Queued,
            "running" => RemoteStatus::Running,
            "succeeded" => RemoteStatus::Succeeded,
            "failed" => RemoteStatus::Failed,
            other => RemoteStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
