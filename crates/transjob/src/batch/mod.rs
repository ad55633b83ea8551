//! Batch orchestration: one job per target culture, created concurrently,
//! with progress published as restartable snapshots.

pub mod grouping;
pub mod orchestrator;
pub mod progress;

pub use grouping::{group_by_culture, job_name, resolve_set, BatchGroup, DEFAULT_NAME_TEMPLATE};
pub use orchestrator::{
    BatchCancel, BatchHandle, BatchOrchestrator, BatchReport, BatchRequest, GroupOutcome,
    GroupResult,
};
pub use progress::{BatchProgress, BroadcastProgress, NoopProgress, ProgressReporter};
