//! Default provider: writes each job as an XLIFF file into the file store
//! and picks the translated file up from the same path.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{Attempt, AttemptFailure, ProviderViews, TranslationProvider};
use crate::codec::{SerializerOptions, XliffDocument, XliffLoader, XliffSerializer};
use crate::config::SharedConfig;
use crate::error::JobError;
use crate::job::{JobStatus, TranslationJob};
use crate::sanitize;
use crate::storage::FileStore;

pub const FILEDROP_ALIAS: &str = "filedrop";
pub const FILEDROP_KEY: Uuid = Uuid::from_u128(0x6a1d3c52_9e0b_4f7a_b1c4_2d8e5f907a31);

const XLIFF20_FORMAT: &str = "xliff20";

/// Provider options stored on the job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDropOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl FileDropOptions {
    fn parse(properties: &str) -> Result<Self, JobError> {
        if properties.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(properties)
            .map_err(|e| JobError::Provider(format!("invalid file drop options: {e}")))
    }
}

#[derive(Debug, Clone)]
struct Settings {
    format: String,
    split_html: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: XLIFF20_FORMAT.to_string(),
            split_html: true,
        }
    }
}

pub struct FileDropProvider {
    store: Arc<dyn FileStore>,
    config: SharedConfig,
    settings: RwLock<Settings>,
    serializer: XliffSerializer,
}

impl FileDropProvider {
    pub fn new(store: Arc<dyn FileStore>, config: SharedConfig) -> Self {
        let provider = Self {
            store,
            config,
            settings: RwLock::new(Settings::default()),
            serializer: XliffSerializer::new(),
        };
        provider.reload();
        provider
    }

    /// Logical path the job is written to, unique per job:
    /// `/media/filedrop/<name>-<target>-<first 8 hex of key>.xlf`.
    pub fn outbound_path(job: &TranslationJob) -> String {
        let key = job.key.simple().to_string();
        format!(
            "/media/{}/{}-{}-{}.xlf",
            FILEDROP_ALIAS,
            sanitize::safe_file_name(&job.name),
            sanitize::safe_file_name(&job.target_culture),
            &key[..8]
        )
    }

    pub fn split_html(&self) -> bool {
        self.settings().split_html
    }

    fn settings(&self) -> Settings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn!("FileDropProvider settings lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    fn write_outbound(&self, job: &TranslationJob) -> Result<String, JobError> {
        let mut options = FileDropOptions::parse(&job.provider_properties)?;
        let settings = self.settings();

        let document = self.serializer.serialize(
            job,
            &job.source_culture,
            &job.target_culture,
            &SerializerOptions::outbound(settings.split_html),
        )?;
        let xml = XliffLoader::to_string(&document)?;

        let path = Self::outbound_path(job);
        self.store.save(&path, &mut xml.as_bytes())?;
        info!(path = %path, units = job.units.len(), "wrote outbound document");

        options.file_name = Some(path);
        serde_json::to_string(&options)
            .map_err(|e| JobError::Provider(format!("cannot encode file drop options: {e}")))
    }

    fn read_returned(&self, job: &TranslationJob) -> Result<TranslationJob, JobError> {
        let options = FileDropOptions::parse(&job.provider_properties)?;
        let path = options
            .file_name
            .ok_or_else(|| JobError::NotReady("job has no outbound file".to_string()))?;

        if !self.store.exists(&path)? {
            return Err(JobError::NotReady(format!("no file found at {path}")));
        }

        let document: XliffDocument = {
            let stream = self.store.open(&path)?;
            XliffLoader::read_from(stream)?
        };

        if !document.has_targets() {
            return Err(JobError::NotReady(format!(
                "{path} contains no translations yet"
            )));
        }

        let updated = self
            .serializer
            .deserialize(&document, job, &SerializerOptions::default())?;
        debug!(
            path = %path,
            translated = updated.translated_count(),
            units = updated.units.len(),
            "merged returned document"
        );
        Ok(updated)
    }

    fn delete_outbound(&self, job: &TranslationJob) -> Result<(), JobError> {
        let options = FileDropOptions::parse(&job.provider_properties)?;
        if let Some(path) = options.file_name {
            if self.store.exists(&path)? {
                self.store.delete(&path)?;
                info!(path = %path, "deleted outbound document");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationProvider for FileDropProvider {
    fn name(&self) -> &str {
        "File Drop Connector"
    }

    fn alias(&self) -> &str {
        FILEDROP_ALIAS
    }

    fn key(&self) -> Uuid {
        FILEDROP_KEY
    }

    fn views(&self) -> ProviderViews {
        let base = format!("/plugins/translate/{FILEDROP_ALIAS}");
        ProviderViews {
            pending: format!("{base}/pending.html"),
            submitted: format!("{base}/submitted.html"),
            approved: format!("{base}/approved.html"),
            config: format!("{base}/config.html"),
        }
    }

    fn active(&self) -> bool {
        self.settings().format.eq_ignore_ascii_case(XLIFF20_FORMAT)
    }

    async fn submit(&self, job: TranslationJob) -> Attempt {
        let span = info_span!("provider.submit", provider = FILEDROP_ALIAS, job = %job.key);
        async move {
            match self.write_outbound(&job) {
                Ok(properties) => {
                    let mut job = job;
                    job.provider_properties = properties;
                    job.set_status(JobStatus::Submitted);
                    Ok(job)
                }
                Err(error) => Err(AttemptFailure::new(job, error)),
            }
        }
        .instrument(span)
        .await
    }

    async fn check(&self, job: TranslationJob) -> Attempt {
        let span = info_span!("provider.check", provider = FILEDROP_ALIAS, job = %job.key);
        async move {
            match self.read_returned(&job) {
                Ok(updated) => Ok(updated),
                Err(error) => Err(AttemptFailure::new(job, error)),
            }
        }
        .instrument(span)
        .await
    }

    async fn remove(&self, job: TranslationJob) -> Attempt {
        match self.delete_outbound(&job) {
            Ok(()) => Ok(job),
            Err(error) => Err(AttemptFailure::new(job, error)),
        }
    }

    fn reload(&self) {
        let settings = {
            let config = match self.config.read() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("Shared config lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            Settings {
                format: config.provider_setting(
                    FILEDROP_ALIAS,
                    "format",
                    XLIFF20_FORMAT.to_string(),
                ),
                split_html: config.provider_setting(FILEDROP_ALIAS, "split", true),
            }
        };

        info!(
            format = %settings.format,
            split = settings.split_html,
            "file drop settings loaded"
        );
        match self.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    fn target_languages(&self, _source_culture: &str) -> Result<Vec<String>, JobError> {
        Err(JobError::NotSupported(
            "the file drop provider accepts any target language".to_string(),
        ))
    }
}
