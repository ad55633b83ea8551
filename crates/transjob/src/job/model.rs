use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::JobStatus;

/// One translatable field of one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUnit {
    pub item_id: i64,
    pub item_name: String,
    /// Property alias of the field on the content item.
    pub field: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Rich-text field that may be split into block-level segments.
    #[serde(default)]
    pub split_html: bool,
}

impl TranslationUnit {
    pub fn new(item_id: i64, item_name: &str, field: &str, source: &str) -> Self {
        Self {
            item_id,
            item_name: item_name.to_string(),
            field: field.to_string(),
            source: source.to_string(),
            target: None,
            split_html: false,
        }
    }

    pub fn html(mut self) -> Self {
        self.split_html = true;
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Stable identifier used as the unit id in interchange documents.
    pub fn id(&self) -> String {
        format!("{}-{}", self.item_id, self.field)
    }

    pub fn is_translated(&self) -> bool {
        self.target.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentField {
    pub alias: String,
    pub value: String,
    #[serde(default)]
    pub is_html: bool,
}

/// Minimal view of a host content node: an id, a name and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ContentField>,
}

impl ContentItem {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, alias: &str, value: &str) -> Self {
        self.fields.push(ContentField {
            alias: alias.to_string(),
            value: value.to_string(),
            is_html: false,
        });
        self
    }

    pub fn with_html_field(mut self, alias: &str, value: &str) -> Self {
        self.fields.push(ContentField {
            alias: alias.to_string(),
            value: value.to_string(),
            is_html: true,
        });
        self
    }

    /// Expands the item into one unit per non-empty field.
    pub fn units(&self) -> Vec<TranslationUnit> {
        self.fields
            .iter()
            .filter(|field| !field.value.trim().is_empty())
            .map(|field| {
                let unit = TranslationUnit::new(self.id, &self.name, &field.alias, &field.value);
                if field.is_html {
                    unit.html()
                } else {
                    unit
                }
            })
            .collect()
    }
}

/// A unit of outsourced translation work: one source culture, one target
/// culture, a set of units and the provider handling it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationJob {
    pub key: Uuid,
    pub name: String,
    pub source_culture: String,
    pub target_culture: String,
    pub status: JobStatus,
    pub provider_key: Uuid,
    /// Opaque to everything except the owning provider.
    #[serde(default)]
    pub provider_properties: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_id: Option<i64>,
    #[serde(default)]
    pub auto_approve: bool,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub units: Vec<TranslationUnit>,
}

impl TranslationJob {
    pub fn unit(&self, id: &str) -> Option<&TranslationUnit> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    /// True once every unit carries a non-empty target.
    pub fn is_fully_translated(&self) -> bool {
        !self.units.is_empty() && self.units.iter().all(TranslationUnit::is_translated)
    }

    pub fn translated_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.is_translated()).count()
    }

    /// Sets the status and bumps `updated_at`. Callers validate the
    /// transition first.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
