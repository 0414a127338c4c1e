//! Domain model (IDs, task records, states, outcomes, errors, ...).
//!
//! 副作用を持たない型だけを置きます。
//! ports / impls / app はすべてここの型を使って会話します。

pub mod content;
pub mod errors;
pub mod extract;
pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;
pub mod upload;

pub use content::ContentItem;
pub use errors::{
    ArtifactError, RemoteError, RunError, StoreError, TransitionError, UploadError,
};
pub use extract::{Extracted, ExtractionRule, VIDEO_URL_RULES};
pub use ids::{TaskId, UploadId};
pub use outcome::{OutcomeKind, PollOutcome};
pub use state::{RemoteStatus, TaskStatus};
pub use task::{GenerationMode, TaskParams, TaskRecord, TaskResult};
pub use upload::UploadKind;
