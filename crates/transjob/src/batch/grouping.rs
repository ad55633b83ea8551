//! Splits a site selection into one job group per target culture.

use tracing::warn;

use crate::error::JobError;
use crate::job::{PickedSite, Site, TranslationSet};

/// Template used when the caller does not supply a job name.
pub const DEFAULT_NAME_TEMPLATE: &str = "Dictionary {to} {date}";

/// One target culture and the picked sites that share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGroup {
    pub culture: String,
    pub job_name: String,
    pub sites: Vec<Site>,
}

/// Resolves the single translation set a selection belongs to.
///
/// Fails with `AmbiguousSet` when the picked sites span zero or several
/// sets, or when the one set they name is not configured (`found: 0`).
pub fn resolve_set<'a>(
    picked: &[PickedSite],
    sets: &'a [TranslationSet],
) -> Result<&'a TranslationSet, JobError> {
    let mut set_ids: Vec<i64> = Vec::new();
    for site in picked {
        if !set_ids.contains(&site.set_id) {
            set_ids.push(site.set_id);
        }
    }

    let [set_id] = set_ids.as_slice() else {
        return Err(JobError::AmbiguousSet {
            found: set_ids.len(),
        });
    };

    sets.iter()
        .find(|set| set.id == *set_id)
        .ok_or(JobError::AmbiguousSet { found: 0 })
}

/// Groups the picked sites by culture, keeping first-seen order.
pub fn group_by_culture(
    picked: &[PickedSite],
    set: &TranslationSet,
    template: &str,
    timestamp: &str,
) -> Vec<BatchGroup> {
    let mut groups: Vec<BatchGroup> = Vec::new();

    for pick in picked {
        let site = match set.site(pick.site_id) {
            Some(site) => site.clone(),
            None => {
                warn!(
                    site = pick.site_id,
                    set = set.id,
                    "picked site is not part of the set, using the picked culture"
                );
                Site {
                    id: pick.site_id,
                    culture: pick.culture.clone(),
                }
            }
        };

        match groups.iter_mut().find(|g| g.culture == pick.culture) {
            Some(group) => {
                if !group.sites.contains(&site) {
                    group.sites.push(site);
                }
            }
            None => groups.push(BatchGroup {
                culture: pick.culture.clone(),
                job_name: job_name(template, &set.source_culture, &pick.culture, &set.name, timestamp),
                sites: vec![site],
            }),
        }
    }

    groups
}

/// Fills `{from}`, `{to}`, `{set}` and `{date}`. Without a `{date}`
/// placeholder the timestamp is appended so batch names stay distinct.
pub fn job_name(template: &str, from: &str, to: &str, set: &str, timestamp: &str) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_NAME_TEMPLATE
    } else {
        template
    };

    let name = template
        .replace("{from}", from)
        .replace("{to}", to)
        .replace("{set}", set);

    if name.contains("{date}") {
        name.replace("{date}", timestamp)
    } else {
        format!("{} {}", name.trim_end(), timestamp)
    }
}
