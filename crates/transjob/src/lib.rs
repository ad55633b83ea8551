pub mod batch;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod logging;
pub mod provider;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod sweep;

pub use batch::{
    BatchCancel, BatchHandle, BatchOrchestrator, BatchProgress, BatchReport, BatchRequest,
    BroadcastProgress, NoopProgress, ProgressReporter,
};
pub use codec::{SerializerOptions, XliffDocument, XliffLoader, XliffSerializer};
pub use config::{load_config, Config, SharedConfig};
pub use error::{
    CodecError, ConfigError, FormatIssue, JobError, Result, StorageError, TransjobError,
};
pub use job::{
    ContentField, ContentItem, JobRequest, JobStatus, PickedSite, Site, TranslationJob,
    TranslationSet, TranslationUnit,
};
pub use provider::{
    Attempt, AttemptFailure, FileDropProvider, ProviderRegistry, ProviderViews,
    TranslationProvider,
};
pub use service::{
    ContentSink, JobQuery, JobService, JobStore, MemorySink, NoopSink, SweepSummary,
};
pub use storage::{FileStore, LocalFileStore, MemoryFileStore};
pub use sweep::CheckSweep;
