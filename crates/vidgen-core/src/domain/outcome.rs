//! Outcome model: how a polled remote job ended.
//!
//! This module does not know about stores or runners. It only defines the
//! "shape" of a terminal poll result so the runner can map it to a task state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coarse classification, handy for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Succeeded,
    SucceededNoArtifact,
    Failed,
    TimedOut,
}

/// Terminal result of polling one remote job.
///
/// - `Succeeded`: the backend finished and an artifact URL was found.
/// - `SucceededNoArtifact`: the backend said "succeeded" but none of the
///   extraction rules found a URL. Kept apart from `Failed` so the runner
///   (and the logs) can say exactly what happened.
/// - `Failed`: the backend reported failure.
/// - `TimedOut`: the deadline passed first. Not a remote failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded {
        video_url: String,
        /// Name of the extraction rule that found `video_url`.
        rule: &'static str,
        elapsed: Duration,
    },
    SucceededNoArtifact {
        elapsed: Duration,
    },
    Failed {
        error: String,
        elapsed: Duration,
    },
    TimedOut {
        elapsed: Duration,
    },
}

impl PollOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            PollOutcome::Succeeded { .. } => OutcomeKind::Succeeded,
            PollOutcome::SucceededNoArtifact { .. } => OutcomeKind::SucceededNoArtifact,
            PollOutcome::Failed { .. } => OutcomeKind::Failed,
            PollOutcome::TimedOut { .. } => OutcomeKind::TimedOut,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Succeeded { elapsed, .. }
            | PollOutcome::SucceededNoArtifact { elapsed }
            | PollOutcome::Failed { elapsed, .. }
            | PollOutcome::TimedOut { elapsed } => *elapsed,
        }
    }
}
