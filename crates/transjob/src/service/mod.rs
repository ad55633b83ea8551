//! Job service: the single entry point for job lifecycle actions.
//!
//! Every action that touches a provider runs under a per-job async lock,
//! validates the transition first and persists only when the provider call
//! succeeded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::JobError;
use crate::job::{JobRequest, JobStatus, TranslationJob};
use crate::provider::{ProviderRegistry, TranslationProvider};

pub mod sink;
pub mod store;

pub use sink::{ContentSink, MemorySink, NoopSink};
pub use store::{JobQuery, JobStore};

/// Upper bound on submitted jobs visited by one sweep pass.
const SWEEP_LIMIT: u64 = 500;

/// Outcome of one pass over all submitted jobs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub checked: usize,
    /// Jobs that left `Submitted` during the pass.
    pub advanced: usize,
    pub not_ready: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderAction {
    Submit,
    Cancel,
    Remove,
}

impl ProviderAction {
    fn name(self) -> &'static str {
        match self {
            ProviderAction::Submit => "submit",
            ProviderAction::Cancel => "cancel",
            ProviderAction::Remove => "remove",
        }
    }

    fn next_status(self) -> JobStatus {
        match self {
            ProviderAction::Submit => JobStatus::Submitted,
            ProviderAction::Cancel => JobStatus::Cancelled,
            ProviderAction::Remove => JobStatus::Removed,
        }
    }
}

pub struct JobService {
    store: Arc<JobStore>,
    providers: Arc<ProviderRegistry>,
    sink: Arc<dyn ContentSink>,
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl JobService {
    pub fn new(store: Arc<JobStore>, providers: Arc<ProviderRegistry>) -> Self {
        Self {
            store,
            providers,
            sink: Arc::new(NoopSink),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ContentSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    async fn lock_job(&self, key: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("Job lock table was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            if locks.len() > 256 {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn provider_for(&self, job: &TranslationJob) -> Result<Arc<dyn TranslationProvider>, JobError> {
        self.providers
            .by_key(job.provider_key)
            .ok_or(JobError::UnknownProvider(job.provider_key))
    }

    pub fn get(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.store.get(key).ok_or(JobError::NotFound(key))
    }

    pub fn list(&self, query: &JobQuery) -> Result<Vec<TranslationJob>, JobError> {
        Ok(self.store.list(query)?)
    }

    /// Creates a `Pending` job, or returns the live job already created for
    /// the same request.
    pub async fn create_job(&self, request: JobRequest) -> Result<TranslationJob, JobError> {
        let provider = self
            .providers
            .by_key(request.provider_key)
            .ok_or(JobError::UnknownProvider(request.provider_key))?;

        let job = request.into_job();
        if !provider.can_translate(&job) {
            return Err(JobError::NotSupported(format!(
                "provider '{}' cannot translate {} to {}",
                provider.alias(),
                job.source_culture,
                job.target_culture
            )));
        }

        let (job, inserted) = self.store.insert_unique(job)?;
        if inserted {
            info!(job = %job.key, name = %job.name, units = job.units.len(), "created job");
        } else {
            debug!(job = %job.key, "request matched existing job");
        }
        Ok(job)
    }

    pub async fn submit(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.provider_transition(key, ProviderAction::Submit)
            .instrument(info_span!("job.submit", job = %key))
            .await
    }

    pub async fn cancel(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.provider_transition(key, ProviderAction::Cancel)
            .instrument(info_span!("job.cancel", job = %key))
            .await
    }

    pub async fn remove(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.provider_transition(key, ProviderAction::Remove)
            .instrument(info_span!("job.remove", job = %key))
            .await
    }

    async fn provider_transition(
        &self,
        key: Uuid,
        action: ProviderAction,
    ) -> Result<TranslationJob, JobError> {
        let _guard = self.lock_job(key).await;
        let job = self.get(key)?;
        let next = action.next_status();

        if !job.status.can_transition_to(next) {
            return Err(JobError::InvalidState {
                key,
                status: job.status,
                action: action.name(),
            });
        }

        let provider = self.provider_for(&job)?;
        if action == ProviderAction::Submit && !provider.active() {
            return Err(JobError::Provider(format!(
                "provider '{}' is not active",
                provider.alias()
            )));
        }

        let attempt = match action {
            ProviderAction::Submit => provider.submit(job).await,
            ProviderAction::Cancel => provider.cancel(job).await,
            ProviderAction::Remove => provider.remove(job).await,
        };
        let mut job = attempt.map_err(|failure| {
            warn!(job = %key, action = action.name(), error = %failure.error, "provider call failed");
            failure.error
        })?;

        job.set_status(next);
        self.store.save(&job)?;
        info!(job = %key, status = %job.status, "job {}", action.name());
        Ok(job)
    }

    /// Asks the provider for returned translations.
    ///
    /// Settled jobs are returned as they are. With auto-approve set, a job
    /// whose units are all translated is applied to the content sink and
    /// moves to `Approved`.
    pub async fn check(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.check_job(key)
            .instrument(info_span!("job.check", job = %key))
            .await
    }

    async fn check_job(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        let _guard = self.lock_job(key).await;
        let job = self.get(key)?;

        if job.status.is_settled() {
            debug!(status = %job.status, "job already settled, nothing to check");
            return Ok(job);
        }
        if job.status != JobStatus::Submitted {
            return Err(JobError::InvalidState {
                key,
                status: job.status,
                action: "check",
            });
        }

        let provider = self.provider_for(&job)?;
        let mut job = provider.check(job).await.map_err(|failure| failure.error)?;
        job.touch();
        self.store.save(&job)?;
        debug!(
            translated = job.translated_count(),
            units = job.units.len(),
            "check merged translations"
        );

        if job.auto_approve && job.is_fully_translated() {
            self.sink.apply(&job).await?;
            job.set_status(JobStatus::Approved);
            self.store.save(&job)?;
            info!("job auto-approved");
        }
        Ok(job)
    }

    /// Applies the translations to the content sink and approves the job.
    pub async fn approve(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        let _guard = self.lock_job(key).await;
        let mut job = self.expect_transition(key, JobStatus::Approved, "approve")?;

        if !job.is_fully_translated() {
            return Err(JobError::NotReady(format!(
                "{} of {} units translated",
                job.translated_count(),
                job.units.len()
            )));
        }

        self.sink.apply(&job).await?;
        job.set_status(JobStatus::Approved);
        self.store.save(&job)?;
        info!(job = %key, "job approved");
        Ok(job)
    }

    pub async fn reject(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.user_transition(key, JobStatus::Rejected, "reject").await
    }

    pub async fn complete(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.user_transition(key, JobStatus::Completed, "complete")
            .await
    }

    /// Moves a cancelled job back to `Pending` so it can be sent again.
    pub async fn reset(&self, key: Uuid) -> Result<TranslationJob, JobError> {
        self.user_transition(key, JobStatus::Pending, "reset").await
    }

    async fn user_transition(
        &self,
        key: Uuid,
        next: JobStatus,
        action: &'static str,
    ) -> Result<TranslationJob, JobError> {
        let _guard = self.lock_job(key).await;
        let mut job = self.expect_transition(key, next, action)?;
        job.set_status(next);
        self.store.save(&job)?;
        info!(job = %key, status = %next, "job {}", action);
        Ok(job)
    }

    fn expect_transition(
        &self,
        key: Uuid,
        next: JobStatus,
        action: &'static str,
    ) -> Result<TranslationJob, JobError> {
        let job = self.get(key)?;
        if job.status.can_transition_to(next) {
            Ok(job)
        } else {
            Err(JobError::InvalidState {
                key,
                status: job.status,
                action,
            })
        }
    }

    /// Checks every submitted job once. Failures are counted, never
    /// propagated.
    pub async fn check_all_submitted(&self) -> Result<SweepSummary, JobError> {
        let query = JobQuery {
            status: Some(JobStatus::Submitted),
            limit: Some(SWEEP_LIMIT),
            ..Default::default()
        };
        let keys: Vec<Uuid> = self.store.list(&query)?.iter().map(|j| j.key).collect();

        let mut summary = SweepSummary::default();
        for key in keys {
            summary.checked += 1;
            match self.check(key).await {
                Ok(job) if job.status != JobStatus::Submitted => summary.advanced += 1,
                Ok(_) => {}
                Err(JobError::NotReady(reason)) => {
                    debug!(job = %key, %reason, "translation not ready");
                    summary.not_ready += 1;
                }
                Err(e) => {
                    warn!(job = %key, error = %e, "check failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.checked > 0 {
            info!(
                checked = summary.checked,
                advanced = summary.advanced,
                not_ready = summary.not_ready,
                failed = summary.failed,
                "sweep finished"
            );
        }
        Ok(summary)
    }
}
