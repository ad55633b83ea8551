use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::grouping::{self, BatchGroup};
use super::progress::{BatchProgress, NoopProgress, ProgressReporter, ProgressTally, Resolution};
use crate::config::BatchConfig;
use crate::error::JobError;
use crate::job::{ContentItem, JobRequest, JobStatus, PickedSite, TranslationJob, TranslationSet};
use crate::service::JobService;

const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_secs(120);

/// A request to create one job per target culture of a site selection.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub picked: Vec<PickedSite>,
    pub sets: Vec<TranslationSet>,
    pub items: Vec<ContentItem>,
    /// Job name template, see [`grouping::job_name`].
    pub name_template: String,
    /// Provider for the created jobs. Defaults to the set's provider.
    pub provider_key: Option<Uuid>,
    pub provider_options: String,
    pub auto_approve: bool,
    /// Submit every created job straight away, even when the set does not
    /// auto-send.
    pub send_now: bool,
}

/// Cooperative cancellation flag for a running batch.
#[derive(Debug, Clone, Default)]
pub struct BatchCancel(Arc<AtomicBool>);

impl BatchCancel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups not yet dispatched are skipped. Running groups finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum GroupResult {
    Created(TranslationJob),
    Failed(JobError),
    Skipped,
}

#[derive(Debug)]
pub struct GroupOutcome {
    pub culture: String,
    pub job_name: String,
    pub result: GroupResult,
}

/// Final result of a batch, one outcome per group in grouping order.
#[derive(Debug)]
pub struct BatchReport {
    pub set_id: i64,
    pub outcomes: Vec<GroupOutcome>,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn jobs(&self) -> impl Iterator<Item = &TranslationJob> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            GroupResult::Created(job) => Some(job),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &JobError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            GroupResult::Failed(e) => Some((o.culture.as_str(), e)),
            _ => None,
        })
    }
}

/// A running batch.
pub struct BatchHandle {
    progress: watch::Receiver<BatchProgress>,
    task: JoinHandle<BatchReport>,
}

impl BatchHandle {
    /// A fresh receiver for progress snapshots. Can be called any number of
    /// times, before or after the batch finishes.
    pub fn progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress.clone()
    }

    pub async fn wait(self) -> Result<BatchReport, JobError> {
        self.task
            .await
            .map_err(|e| JobError::Provider(format!("batch task failed: {e}")))
    }
}

/// Everything a group task needs besides its own group.
struct GroupPlan {
    set_id: i64,
    source_culture: String,
    provider_key: Uuid,
    provider_options: String,
    items: Vec<ContentItem>,
    auto_approve: bool,
    send: bool,
    timeout: Duration,
}

pub struct BatchOrchestrator {
    service: Arc<JobService>,
    group_timeout: Duration,
    reporter: Arc<dyn ProgressReporter>,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<JobService>) -> Self {
        Self {
            service,
            group_timeout: DEFAULT_GROUP_TIMEOUT,
            reporter: Arc::new(NoopProgress),
        }
    }

    pub fn with_config(service: Arc<JobService>, config: &BatchConfig) -> Self {
        Self::new(service).with_group_timeout(Duration::from_secs(config.group_timeout_secs))
    }

    pub fn with_group_timeout(mut self, timeout: Duration) -> Self {
        self.group_timeout = timeout;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Validates the selection and starts one task per culture group.
    ///
    /// Set resolution happens before anything is spawned, so an
    /// `AmbiguousSet` error means no job was created.
    pub fn start(&self, request: BatchRequest, cancel: BatchCancel) -> Result<BatchHandle, JobError> {
        let set = grouping::resolve_set(&request.picked, &request.sets)?;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let groups = grouping::group_by_culture(&request.picked, set, &request.name_template, &timestamp);

        let plan = Arc::new(GroupPlan {
            set_id: set.id,
            source_culture: set.source_culture.clone(),
            provider_key: request.provider_key.unwrap_or(set.provider_key),
            provider_options: request.provider_options,
            items: request.items,
            auto_approve: set.auto_approve && request.auto_approve,
            send: request.send_now || set.auto_send,
            timeout: self.group_timeout,
        });

        info!(
            set = set.id,
            groups = groups.len(),
            items = plan.items.len(),
            "starting batch"
        );

        let tally = Arc::new(ProgressTally::new(groups.len(), self.reporter.clone()));
        let progress = tally.subscribe();
        let service = self.service.clone();
        let task = tokio::spawn(
            run_groups(service, groups, plan, tally, cancel)
                .instrument(info_span!("batch", set = set.id)),
        );

        Ok(BatchHandle { progress, task })
    }

    /// Starts the batch and waits for its report.
    pub async fn run(&self, request: BatchRequest, cancel: BatchCancel) -> Result<BatchReport, JobError> {
        self.start(request, cancel)?.wait().await
    }
}

async fn run_groups(
    service: Arc<JobService>,
    groups: Vec<BatchGroup>,
    plan: Arc<GroupPlan>,
    tally: Arc<ProgressTally>,
    cancel: BatchCancel,
) -> BatchReport {
    let names: Vec<(String, String)> = groups
        .iter()
        .map(|g| (g.culture.clone(), g.job_name.clone()))
        .collect();
    let mut slots: Vec<Option<GroupOutcome>> = (0..groups.len()).map(|_| None).collect();
    let mut tasks = JoinSet::new();

    for (index, group) in groups.into_iter().enumerate() {
        if cancel.is_cancelled() {
            tally.record(&group.job_name, Resolution::Skipped);
            slots[index] = Some(GroupOutcome {
                culture: group.culture,
                job_name: group.job_name,
                result: GroupResult::Skipped,
            });
            continue;
        }

        let span = info_span!("batch.group", culture = %group.culture);
        let service = service.clone();
        let plan = plan.clone();
        tasks.spawn(async move { (index, run_group(service, group, plan).await) }.instrument(span));
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                let resolution = match outcome.result {
                    GroupResult::Created(_) => Resolution::Completed,
                    GroupResult::Failed(_) => Resolution::Failed,
                    GroupResult::Skipped => Resolution::Skipped,
                };
                tally.record(&outcome.job_name, resolution);
                slots[index] = Some(outcome);
            }
            Err(e) => {
                error!("batch group task failed: {}", e);
                tally.record("unknown group", Resolution::Failed);
            }
        }
    }

    let outcomes: Vec<GroupOutcome> = slots
        .into_iter()
        .zip(names)
        .map(|(slot, (culture, job_name))| {
            slot.unwrap_or_else(|| GroupOutcome {
                culture,
                job_name,
                result: GroupResult::Failed(JobError::Provider("group task aborted".to_string())),
            })
        })
        .collect();

    let count = |f: fn(&GroupResult) -> bool| outcomes.iter().filter(|o| f(&o.result)).count();
    let report = BatchReport {
        set_id: plan.set_id,
        completed: count(|r| matches!(r, GroupResult::Created(_))),
        failed: count(|r| matches!(r, GroupResult::Failed(_))),
        skipped: count(|r| matches!(r, GroupResult::Skipped)),
        outcomes,
    };

    info!(
        completed = report.completed,
        failed = report.failed,
        skipped = report.skipped,
        "batch finished"
    );
    report
}

/// Waits at most `plan.timeout` for the group's job.
///
/// Creation and submit run in their own task. A timed-out group is reported
/// as failed while that task runs to completion and persists the job.
async fn run_group(
    service: Arc<JobService>,
    group: BatchGroup,
    plan: Arc<GroupPlan>,
) -> GroupOutcome {
    let timeout = plan.timeout;
    let culture = group.culture.clone();
    let mut work = tokio::spawn(
        create_and_send(service, group.clone(), plan)
            .instrument(info_span!("batch.group.work", culture = %culture)),
    );

    let result = match tokio::time::timeout(timeout, &mut work).await {
        Ok(Ok(Ok(job))) => GroupResult::Created(job),
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "group failed");
            GroupResult::Failed(e)
        }
        Ok(Err(e)) => {
            error!("group task failed: {}", e);
            GroupResult::Failed(JobError::Provider(format!("group task failed: {e}")))
        }
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs_f64(),
                "group timed out, letting it finish in the background"
            );
            tokio::spawn(
                async move {
                    match work.await {
                        Ok(Ok(job)) => info!(job = %job.key, status = %job.status, "timed out group finished"),
                        Ok(Err(e)) => warn!(error = %e, "timed out group failed"),
                        Err(e) => error!("timed out group task failed: {}", e),
                    }
                }
                .instrument(info_span!("batch.group.late", culture = %culture)),
            );
            GroupResult::Failed(JobError::Timeout(timeout.as_secs()))
        }
    };

    GroupOutcome {
        culture: group.culture,
        job_name: group.job_name,
        result,
    }
}

async fn create_and_send(
    service: Arc<JobService>,
    group: BatchGroup,
    plan: Arc<GroupPlan>,
) -> Result<TranslationJob, JobError> {
    let request = JobRequest::new(
        &group.job_name,
        &plan.source_culture,
        &group.culture,
        plan.provider_key,
    )
    .with_items(&plan.items)
    .with_provider_properties(&plan.provider_options)
    .with_set(plan.set_id)
    .with_auto_approve(plan.auto_approve);

    let job = service.create_job(request).await?;
    if plan.send && job.status == JobStatus::Pending {
        service.submit(job.key).await
    } else {
        Ok(job)
    }
}
