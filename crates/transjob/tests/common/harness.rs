//! Test harness for isolated job lifecycle tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use uuid::Uuid;

use transjob::provider::{FILEDROP_ALIAS, FILEDROP_KEY};
use transjob::{
    Attempt, AttemptFailure, Config, FileDropProvider, FileStore, JobError, JobService, JobStore,
    LocalFileStore, MemoryFileStore, MemorySink, ProviderRegistry, ProviderViews, SharedConfig,
    TranslationJob, TranslationProvider,
};

/// Provider that fails submission for chosen target cultures, optionally
/// after a delay, and counts submit calls.
///
/// `delay` passes before the dispatch is counted, `ack_delay` after it, as a
/// provider that has already sent the job but is slow to answer.
pub struct ScriptedProvider {
    pub key: Uuid,
    failing: HashSet<String>,
    delay: Duration,
    ack_delay: Duration,
    pub submits: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            key: Uuid::new_v4(),
            failing: HashSet::new(),
            delay: Duration::ZERO,
            ack_delay: Duration::ZERO,
            submits: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, culture: &str) -> Self {
        self.failing.insert(culture.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = delay;
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn alias(&self) -> &str {
        "scripted"
    }

    fn key(&self) -> Uuid {
        self.key
    }

    fn views(&self) -> ProviderViews {
        ProviderViews::default()
    }

    fn active(&self) -> bool {
        true
    }

    async fn submit(&self, job: TranslationJob) -> Attempt {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.submits.fetch_add(1, Ordering::SeqCst);
        if !self.ack_delay.is_zero() {
            tokio::time::sleep(self.ack_delay).await;
        }
        if self.failing.contains(&job.target_culture) {
            let culture = job.target_culture.clone();
            return Err(AttemptFailure::new(
                job,
                JobError::Provider(format!("{culture} is unavailable")),
            ));
        }
        Ok(job)
    }

    async fn check(&self, job: TranslationJob) -> Attempt {
        Err(AttemptFailure::new(
            job,
            JobError::NotReady("scripted provider never returns".to_string()),
        ))
    }

    fn reload(&self) {}
}

/// A job service with the file drop provider and a scripted provider
/// registered, writing into an isolated file store.
pub struct TestHarness {
    /// Keeps the on-disk store alive for the lifetime of the harness.
    temp_dir: Option<TempDir>,
    pub files: Arc<dyn FileStore>,
    pub memory: Option<Arc<MemoryFileStore>>,
    pub config: SharedConfig,
    pub filedrop: Arc<FileDropProvider>,
    pub scripted: Arc<ScriptedProvider>,
    pub sink: Arc<MemorySink>,
    pub service: Arc<JobService>,
}

impl TestHarness {
    /// Harness over an in-memory file store.
    pub fn new() -> Self {
        Self::with_scripted(ScriptedProvider::new())
    }

    pub fn with_scripted(scripted: ScriptedProvider) -> Self {
        let memory = Arc::new(MemoryFileStore::new());
        Self::build(memory.clone(), Some(memory), None, scripted)
    }

    /// Harness over a `LocalFileStore` rooted in a temp directory.
    pub fn on_disk() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let files = Arc::new(LocalFileStore::new(temp_dir.path()));
        Self::build(files, None, Some(temp_dir), ScriptedProvider::new())
    }

    fn build(
        files: Arc<dyn FileStore>,
        memory: Option<Arc<MemoryFileStore>>,
        temp_dir: Option<TempDir>,
        scripted: ScriptedProvider,
    ) -> Self {
        let config = Config::default().into_shared();
        let filedrop = Arc::new(FileDropProvider::new(files.clone(), config.clone()));
        let scripted = Arc::new(scripted);
        let registry = ProviderRegistry::new()
            .with(filedrop.clone())
            .expect("register file drop")
            .with(scripted.clone())
            .expect("register scripted");

        let sink = Arc::new(MemorySink::new());
        let service = JobService::new(Arc::new(JobStore::new()), Arc::new(registry))
            .with_sink(sink.clone());

        Self {
            temp_dir,
            files,
            memory,
            config,
            filedrop,
            scripted,
            sink,
            service: Arc::new(service),
        }
    }

    pub fn filedrop_key(&self) -> Uuid {
        FILEDROP_KEY
    }

    pub fn scripted_key(&self) -> Uuid {
        self.scripted.key
    }

    pub fn temp_path(&self) -> Option<&std::path::Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Sets a file drop setting and reloads the provider.
    pub fn set_filedrop_setting(&self, key: &str, value: serde_json::Value) {
        self.config
            .write()
            .expect("config lock")
            .set_provider_setting(FILEDROP_ALIAS, key, value);
        self.service.providers().reload_all();
    }

    pub fn read_file(&self, path: &str) -> String {
        let mut content = String::new();
        let mut stream = self.files.open(path).expect("open file");
        std::io::Read::read_to_string(&mut stream, &mut content).expect("read file");
        content
    }

    pub fn write_file(&self, path: &str, content: &str) {
        self.files
            .save(path, &mut content.as_bytes())
            .expect("write file");
    }
}
