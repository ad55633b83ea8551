//! Translation provider protocol.
//!
//! A provider takes ownership of a job for the duration of a call and hands
//! it back: updated on success, untouched alongside the cause on failure.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::JobError;
use crate::job::TranslationJob;

pub mod filedrop;
pub mod registry;

pub use filedrop::{FileDropOptions, FileDropProvider, FILEDROP_ALIAS, FILEDROP_KEY};
pub use registry::ProviderRegistry;

/// Admin views a provider contributes. Opaque URIs to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderViews {
    pub pending: String,
    pub submitted: String,
    pub approved: String,
    pub config: String,
}

/// A failed provider call. `job` is the job exactly as it was passed in.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct AttemptFailure {
    pub job: TranslationJob,
    #[source]
    pub error: JobError,
}

impl AttemptFailure {
    pub fn new(job: TranslationJob, error: impl Into<JobError>) -> Self {
        Self {
            job,
            error: error.into(),
        }
    }
}

pub type Attempt = Result<TranslationJob, AttemptFailure>;

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn alias(&self) -> &str;

    fn key(&self) -> Uuid;

    fn views(&self) -> ProviderViews;

    /// Whether the provider can currently accept work.
    fn active(&self) -> bool;

    /// Hands the job to the provider. On success the job is `Submitted` and
    /// its provider properties point at whatever the provider stored.
    async fn submit(&self, job: TranslationJob) -> Attempt;

    /// Looks for returned translations and merges them into the job.
    /// Returns `NotReady` without waiting when nothing is available yet.
    async fn check(&self, job: TranslationJob) -> Attempt;

    async fn cancel(&self, job: TranslationJob) -> Attempt {
        Ok(job)
    }

    async fn remove(&self, job: TranslationJob) -> Attempt {
        Ok(job)
    }

    /// Re-reads settings from the shared configuration.
    fn reload(&self);

    fn can_translate(&self, _job: &TranslationJob) -> bool {
        true
    }

    fn target_languages(&self, _source_culture: &str) -> Result<Vec<String>, JobError> {
        Err(JobError::NotSupported(format!(
            "provider '{}' does not list target languages",
            self.alias()
        )))
    }
}
