use std::collections::HashMap;

use tracing::debug;

use super::html::{self, HtmlSkeleton, SkeletonPart};
use super::xliff::{
    FileEntry, Ignorable, Segment, SegmentState, UnitPart, XliffDocument, XliffFile, XliffUnit,
};
use crate::error::{CodecError, FormatIssue};
use crate::job::{TranslationJob, TranslationUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializerOptions {
    /// Emit an empty `<target/>` for untranslated units.
    pub include_blank_target: bool,
    /// Split rich-text units into block-level segments.
    pub split_html: bool,
    /// When reading back, fall back to the returned source text for
    /// segments without a target.
    pub copy_from_source: bool,
}

impl SerializerOptions {
    pub fn outbound(split_html: bool) -> Self {
        Self {
            include_blank_target: false,
            split_html,
            copy_from_source: false,
        }
    }
}

/// Converts jobs to XLIFF documents and merges returned documents back in.
#[derive(Debug, Clone, Copy, Default)]
pub struct XliffSerializer;

impl XliffSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Builds a document with one `<file>` per content item, in first-seen
    /// order, and one `<unit>` per job unit.
    pub fn serialize(
        &self,
        job: &TranslationJob,
        source_locale: &str,
        target_locale: &str,
        options: &SerializerOptions,
    ) -> Result<XliffDocument, CodecError> {
        let mut document = XliffDocument::new(source_locale, target_locale);
        let mut file_index: HashMap<i64, usize> = HashMap::new();

        for unit in &job.units {
            let xunit = if options.split_html && unit.split_html {
                split_unit(unit, options)?
            } else {
                plain_unit(unit, options)
            };

            let index = *file_index.entry(unit.item_id).or_insert_with(|| {
                document.files.push(XliffFile {
                    id: format!("n{}", unit.item_id),
                    original: Some(unit.item_name.clone()),
                    entries: Vec::new(),
                });
                document.files.len() - 1
            });
            document.files[index].entries.push(FileEntry::Unit(xunit));
        }

        debug!(
            job = %job.key,
            files = document.files.len(),
            units = job.units.len(),
            "serialized job"
        );
        Ok(document)
    }

    /// Returns a copy of `job` with targets taken from `document`.
    ///
    /// The document's `srcLang`/`trgLang` must name the job's cultures.
    /// Only units with a complete translation are updated. Units missing
    /// from the document, or without targets, keep whatever target they had.
    pub fn deserialize(
        &self,
        document: &XliffDocument,
        job: &TranslationJob,
        options: &SerializerOptions,
    ) -> Result<TranslationJob, CodecError> {
        expect_language("srcLang", Some(&document.src_lang), &job.source_culture)?;
        expect_language("trgLang", document.trg_lang.as_deref(), &job.target_culture)?;

        let returned: HashMap<&str, &XliffUnit> = document
            .units()
            .into_iter()
            .map(|unit| (unit.id.as_str(), unit))
            .collect();

        let mut updated = job.clone();
        let mut merged = 0usize;
        for unit in updated.units.iter_mut() {
            let Some(xunit) = returned.get(unit.id().as_str()) else {
                continue;
            };
            if let Some(target) = reconstruct(unit, xunit, options)? {
                unit.target = Some(target);
                merged += 1;
            }
        }

        debug!(job = %job.key, merged, "deserialized job");
        Ok(updated)
    }
}

fn expect_language(
    attribute: &'static str,
    found: Option<&str>,
    expected: &str,
) -> Result<(), CodecError> {
    match found {
        Some(lang) if lang.trim().eq_ignore_ascii_case(expected) => Ok(()),
        other => Err(CodecError::Format(FormatIssue::LanguageMismatch {
            attribute,
            expected: expected.to_string(),
            found: other.unwrap_or("").to_string(),
        })),
    }
}

fn target_for(existing: Option<&str>, options: &SerializerOptions) -> Option<String> {
    match existing {
        Some(target) if !target.is_empty() => Some(target.to_string()),
        _ if options.include_blank_target => Some(String::new()),
        _ => None,
    }
}

fn state_for(target: Option<&str>) -> SegmentState {
    if target.is_some_and(|t| !t.is_empty()) {
        SegmentState::Translated
    } else {
        SegmentState::Initial
    }
}

fn plain_unit(unit: &TranslationUnit, options: &SerializerOptions) -> XliffUnit {
    XliffUnit {
        id: unit.id(),
        name: Some(unit.field.clone()),
        parts: vec![UnitPart::Segment(Segment {
            id: None,
            state: Some(state_for(unit.target.as_deref())),
            source: unit.source.clone(),
            target: target_for(unit.target.as_deref(), options),
        })],
    }
}

fn split_unit(unit: &TranslationUnit, options: &SerializerOptions) -> Result<XliffUnit, CodecError> {
    let skeleton = html::split(&unit.source).map_err(|e| CodecError::Serialization {
        unit: unit.id(),
        reason: e.to_string(),
    })?;

    // An existing target only carries over when it splits the same way.
    let existing: Vec<String> = unit
        .target
        .as_deref()
        .and_then(|target| html::split(target).ok())
        .filter(|target| target.segment_count() == skeleton.segment_count())
        .map(|target| target.segments().map(str::to_string).collect())
        .unwrap_or_default();

    let mut parts = Vec::new();
    let mut segment_no = 0usize;
    let mut ignorable_no = 0usize;
    for part in skeleton.parts() {
        match part {
            SkeletonPart::Markup(markup) => {
                ignorable_no += 1;
                parts.push(UnitPart::Ignorable(Ignorable {
                    id: Some(format!("i{ignorable_no}")),
                    source: markup.clone(),
                    target: None,
                }));
            }
            SkeletonPart::Segment(text) => {
                let target = existing.get(segment_no).map(String::as_str);
                segment_no += 1;
                parts.push(UnitPart::Segment(Segment {
                    id: Some(format!("s{segment_no}")),
                    state: Some(state_for(target)),
                    source: text.clone(),
                    target: target_for(target, options),
                }));
            }
        }
    }

    Ok(XliffUnit {
        id: unit.id(),
        name: Some(unit.field.clone()),
        parts,
    })
}

/// Rebuilds one unit's target from its returned form. `None` means the
/// document holds no complete translation for it.
fn reconstruct(
    unit: &TranslationUnit,
    xunit: &XliffUnit,
    options: &SerializerOptions,
) -> Result<Option<String>, CodecError> {
    let mut texts = Vec::new();
    for segment in xunit.segments() {
        match segment.translation() {
            Some(target) => texts.push(target.to_string()),
            None if options.copy_from_source && !segment.source.is_empty() => {
                texts.push(segment.source.clone())
            }
            None => return Ok(None),
        }
    }

    if texts.is_empty() {
        return Ok(None);
    }

    if texts.len() == 1 && !xunit.has_ignorables() {
        return Ok(texts.pop());
    }

    let skeleton: HtmlSkeleton = html::split(&unit.source).map_err(|e| CodecError::Serialization {
        unit: unit.id(),
        reason: e.to_string(),
    })?;

    skeleton.rebuild(&texts).map(Some).ok_or_else(|| {
        CodecError::Format(FormatIssue::Malformed(format!(
            "unit '{}' returned {} segments, expected {}",
            unit.id(),
            texts.len(),
            skeleton.segment_count()
        )))
    })
}
