use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: i64,
    pub culture: String,
}

/// A configured translation set: one source culture, the sites it feeds and
/// the provider policy applied to jobs created from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationSet {
    pub id: i64,
    pub name: String,
    pub source_culture: String,
    pub provider_key: Uuid,
    /// Submit jobs to the provider as soon as they are created.
    #[serde(default)]
    pub auto_send: bool,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub sites: Vec<Site>,
}

impl TranslationSet {
    pub fn site(&self, id: i64) -> Option<&Site> {
        self.sites.iter().find(|site| site.id == id)
    }
}

/// A site and culture the caller picked as a translation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedSite {
    pub site_id: i64,
    pub culture: String,
    pub set_id: i64,
}

impl PickedSite {
    pub fn new(site_id: i64, culture: &str, set_id: i64) -> Self {
        Self {
            site_id,
            culture: culture.to_string(),
            set_id,
        }
    }
}
