//! Builders for test data.

#![allow(dead_code)]

use uuid::Uuid;

use transjob::batch::BatchRequest;
use transjob::{ContentItem, JobRequest, PickedSite, Site, TranslationSet};

/// Two content items, one with a rich-text body.
pub fn sample_items() -> Vec<ContentItem> {
    vec![
        ContentItem::new(1001, "Home")
            .with_field("title", "Welcome")
            .with_html_field("body", "<h1>Hello</h1><p>Our <b>new</b> site</p>"),
        ContentItem::new(1002, "Contact").with_field("title", "Get in touch"),
    ]
}

pub fn sample_request(name: &str, target: &str, provider_key: Uuid) -> JobRequest {
    JobRequest::new(name, "en-GB", target, provider_key).with_items(&sample_items())
}

/// Builder for `TranslationSet`.
pub struct SetBuilder {
    set: TranslationSet,
}

impl SetBuilder {
    pub fn new(id: i64, provider_key: Uuid) -> Self {
        Self {
            set: TranslationSet {
                id,
                name: format!("Set {id}"),
                source_culture: "en-GB".to_string(),
                provider_key,
                auto_send: false,
                auto_approve: false,
                sites: Vec::new(),
            },
        }
    }

    pub fn site(mut self, id: i64, culture: &str) -> Self {
        self.set.sites.push(Site {
            id,
            culture: culture.to_string(),
        });
        self
    }

    pub fn auto_send(mut self, auto_send: bool) -> Self {
        self.set.auto_send = auto_send;
        self
    }

    pub fn auto_approve(mut self, auto_approve: bool) -> Self {
        self.set.auto_approve = auto_approve;
        self
    }

    pub fn build(self) -> TranslationSet {
        self.set
    }
}

/// Picks every site of the set.
pub fn pick_all(set: &TranslationSet) -> Vec<PickedSite> {
    set.sites
        .iter()
        .map(|site| PickedSite::new(site.id, &site.culture, set.id))
        .collect()
}

pub fn batch_request(set: TranslationSet, picked: Vec<PickedSite>) -> BatchRequest {
    BatchRequest {
        picked,
        sets: vec![set],
        items: sample_items(),
        name_template: "Batch {to} {date}".to_string(),
        ..Default::default()
    }
}
