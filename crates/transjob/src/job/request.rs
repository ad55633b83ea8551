use chrono::Utc;
use uuid::Uuid;

use super::model::{ContentItem, TranslationJob, TranslationUnit};
use super::status::JobStatus;
use crate::sanitize;

/// Everything needed to create a job. The service turns a request into a
/// `Pending` job, deduplicating on [`JobRequest::fingerprint`].
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub name: String,
    pub source_culture: String,
    pub target_culture: String,
    pub provider_key: Uuid,
    pub provider_properties: String,
    pub set_id: Option<i64>,
    pub auto_approve: bool,
    pub units: Vec<TranslationUnit>,
}

impl JobRequest {
    pub fn new(name: &str, source_culture: &str, target_culture: &str, provider_key: Uuid) -> Self {
        Self {
            name: name.to_string(),
            source_culture: source_culture.to_string(),
            target_culture: target_culture.to_string(),
            provider_key,
            provider_properties: String::new(),
            set_id: None,
            auto_approve: false,
            units: Vec::new(),
        }
    }

    pub fn with_units(mut self, units: Vec<TranslationUnit>) -> Self {
        self.units = units;
        self
    }

    pub fn with_items(mut self, items: &[ContentItem]) -> Self {
        self.units = items.iter().flat_map(ContentItem::units).collect();
        self
    }

    pub fn with_provider_properties(mut self, properties: &str) -> Self {
        self.provider_properties = properties.to_string();
        self
    }

    pub fn with_set(mut self, set_id: i64) -> Self {
        self.set_id = Some(set_id);
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    /// Stable hash over name, provider, cultures and the sorted unit ids.
    /// Two requests for the same work share a fingerprint regardless of unit
    /// order.
    pub fn fingerprint(&self) -> String {
        let provider = self.provider_key.to_string();
        let mut unit_ids: Vec<String> = self.units.iter().map(TranslationUnit::id).collect();
        unit_ids.sort();
        unit_ids.dedup();

        let head = [
            self.name.as_str(),
            provider.as_str(),
            self.source_culture.as_str(),
            self.target_culture.as_str(),
        ];
        sanitize::fingerprint(head.into_iter().chain(unit_ids.iter().map(String::as_str)))
    }

    pub fn into_job(self) -> TranslationJob {
        let fingerprint = self.fingerprint();
        let now = Utc::now();
        TranslationJob {
            key: Uuid::new_v4(),
            name: self.name,
            source_culture: self.source_culture,
            target_culture: self.target_culture,
            status: JobStatus::Pending,
            provider_key: self.provider_key,
            provider_properties: self.provider_properties,
            set_id: self.set_id,
            auto_approve: self.auto_approve,
            fingerprint,
            created_at: now,
            updated_at: now,
            units: self.units,
        }
    }
}
