//! XLIFF 2.0 document model and stream loader.

use std::io::{Read, Write};

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CodecError, FormatIssue};

pub const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:2.0";
pub const XLIFF_VERSION: &str = "2.0";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn default_namespace() -> String {
    XLIFF_NAMESPACE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "xliff")]
pub struct XliffDocument {
    #[serde(rename = "@xmlns", default = "default_namespace")]
    pub namespace: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@srcLang")]
    pub src_lang: String,
    #[serde(rename = "@trgLang", default, skip_serializing_if = "Option::is_none")]
    pub trg_lang: Option<String>,
    #[serde(rename = "file", default)]
    pub files: Vec<XliffFile>,
}

/// One `<file>` per content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XliffFile {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@original", default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(rename = "$value", default)]
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileEntry {
    #[serde(rename = "unit")]
    Unit(XliffUnit),
    #[serde(rename = "group")]
    Group(XliffGroup),
    #[serde(rename = "notes")]
    Notes(Notes),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XliffGroup {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "$value", default)]
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XliffUnit {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "$value", default)]
    pub parts: Vec<UnitPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitPart {
    #[serde(rename = "segment")]
    Segment(Segment),
    #[serde(rename = "ignorable")]
    Ignorable(Ignorable),
    #[serde(rename = "notes")]
    Notes(Notes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    Initial,
    Translated,
    Reviewed,
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@state", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SegmentState>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Segment {
    /// The target text, if one is present and non-empty.
    pub fn translation(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

/// Markup between segments. Carried for the translator's benefit only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ignorable {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notes {
    #[serde(rename = "note", default)]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "@category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl XliffDocument {
    pub fn new(src_lang: &str, trg_lang: &str) -> Self {
        Self {
            namespace: default_namespace(),
            version: XLIFF_VERSION.to_string(),
            src_lang: src_lang.to_string(),
            trg_lang: Some(trg_lang.to_string()),
            files: Vec::new(),
        }
    }

    /// All units in document order, including those nested in groups.
    pub fn units(&self) -> Vec<&XliffUnit> {
        let mut units = Vec::new();
        for file in &self.files {
            collect_units(&file.entries, &mut units);
        }
        units
    }

    pub fn unit(&self, id: &str) -> Option<&XliffUnit> {
        self.units().into_iter().find(|unit| unit.id == id)
    }

    /// True when at least one segment carries a translation.
    pub fn has_targets(&self) -> bool {
        self.units()
            .iter()
            .flat_map(|unit| unit.segments())
            .any(|segment| segment.translation().is_some())
    }
}

fn collect_units<'a>(entries: &'a [FileEntry], out: &mut Vec<&'a XliffUnit>) {
    for entry in entries {
        match entry {
            FileEntry::Unit(unit) => out.push(unit),
            FileEntry::Group(group) => collect_units(&group.entries, out),
            FileEntry::Notes(_) => {}
        }
    }
}

impl XliffUnit {
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.parts.iter().filter_map(|part| match part {
            UnitPart::Segment(segment) => Some(segment),
            _ => None,
        })
    }

    pub fn has_ignorables(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, UnitPart::Ignorable(_)))
    }
}

/// Reads and writes XLIFF 2.0 documents over byte streams.
pub struct XliffLoader;

impl XliffLoader {
    /// Parses a document, refusing anything that is not XLIFF 2.0.
    pub fn read_from<R: Read>(mut reader: R) -> Result<XliffDocument, CodecError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let content = String::from_utf8(bytes)
            .map_err(|e| CodecError::Format(FormatIssue::Malformed(e.to_string())))?;

        check_root(&content)?;
        let content = normalize(&content)?;

        quick_xml::de::from_str(&content)
            .map_err(|e| CodecError::Format(FormatIssue::Malformed(e.to_string())))
    }

    pub fn write_to<W: Write>(mut writer: W, document: &XliffDocument) -> Result<(), CodecError> {
        let xml = Self::to_string(document)?;
        writer.write_all(xml.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_string(document: &XliffDocument) -> Result<String, CodecError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        document
            .serialize(serializer)
            .map_err(|e| CodecError::Serialization {
                unit: "<document>".to_string(),
                reason: e.to_string(),
            })?;

        Ok(format!("{XML_DECLARATION}{body}\n"))
    }
}

/// Checks the root element before handing the text to serde, so that a
/// well-formed document of the wrong kind is reported as such.
fn check_root(content: &str) -> Result<(), CodecError> {
    let mut reader = Reader::from_str(content);

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                if element.local_name().as_ref() != b"xliff" {
                    return Err(CodecError::Format(FormatIssue::NotXliff2 {
                        found: format!("root element <{name}>"),
                    }));
                }

                let version = element
                    .try_get_attribute("version")
                    .map_err(|e| CodecError::Format(FormatIssue::Malformed(e.to_string())))?
                    .map(|attr| String::from_utf8_lossy(&attr.value).into_owned());

                return match version.as_deref() {
                    Some(XLIFF_VERSION) => Ok(()),
                    Some(other) => Err(CodecError::Format(FormatIssue::NotXliff2 {
                        found: format!("version {other}"),
                    })),
                    None => Err(CodecError::Format(FormatIssue::NotXliff2 {
                        found: "no version attribute".to_string(),
                    })),
                };
            }
            Ok(Event::Eof) => {
                return Err(CodecError::Format(FormatIssue::Malformed(
                    "document has no root element".to_string(),
                )))
            }
            Ok(_) => continue,
            Err(e) => return Err(CodecError::Format(FormatIssue::Malformed(e.to_string()))),
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> CodecError {
    CodecError::Format(FormatIssue::Malformed(e.to_string()))
}

/// Elements whose text is a translatable string.
fn holds_text(name: &[u8]) -> bool {
    matches!(name, b"source" | b"target" | b"note")
}

/// Whether the model reads `child` when it appears inside `parent`.
fn is_modelled(parent: Option<&[u8]>, child: &[u8]) -> bool {
    matches!(
        (parent, child),
        (None, b"xliff")
            | (Some(b"xliff"), b"file")
            | (Some(b"file" | b"group"), b"unit" | b"group" | b"notes")
            | (Some(b"unit"), b"segment" | b"ignorable" | b"notes")
            | (Some(b"segment" | b"ignorable"), b"source" | b"target")
            | (Some(b"notes"), b"note")
    )
}

/// Rewrites a document into the subset the model deserializes.
///
/// Elements the model has no place for (`originalData`, `skeleton`, module
/// extensions) are dropped with their content. Inline codes inside
/// `<source>`, `<target>` and `<note>` (`<ph/>`, `<pc>`, `<mrk>`, ...) are
/// kept as their markup text, so `Hi <ph id="1"/>` reads as that string.
fn normalize(content: &str) -> Result<String, CodecError> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::with_capacity(content.len()));
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut skipping = 0usize;
    let mut inline = 0usize;

    loop {
        let event = reader.read_event().map_err(malformed)?;
        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => skipping -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        let parent = open.last().map(Vec::as_slice);
        let in_text = inline > 0 || parent.is_some_and(holds_text);
        match event {
            Event::Start(element) if in_text => {
                let markup = format!("<{}>", String::from_utf8_lossy(&element).trim_end());
                writer.write_event(Event::Text(BytesText::new(&markup))).map_err(malformed)?;
                inline += 1;
            }
            Event::Empty(element) if in_text => {
                let markup = format!("<{}/>", String::from_utf8_lossy(&element).trim_end());
                writer.write_event(Event::Text(BytesText::new(&markup))).map_err(malformed)?;
            }
            Event::End(element) if inline > 0 => {
                let markup = format!("</{}>", String::from_utf8_lossy(element.name().as_ref()));
                writer.write_event(Event::Text(BytesText::new(&markup))).map_err(malformed)?;
                inline -= 1;
            }
            Event::Start(element) => {
                let local = element.local_name().as_ref().to_vec();
                let foreign = parent.is_some() && element.name().prefix().is_some();
                if foreign || !is_modelled(parent, &local) {
                    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                    debug!(element = %name, "skipping element");
                    skipping = 1;
                    continue;
                }
                open.push(local);
                writer.write_event(Event::Start(element)).map_err(malformed)?;
            }
            Event::Empty(element) => {
                let foreign = parent.is_some() && element.name().prefix().is_some();
                if foreign || !is_modelled(parent, element.local_name().as_ref()) {
                    continue;
                }
                writer.write_event(Event::Empty(element)).map_err(malformed)?;
            }
            Event::End(element) => {
                open.pop();
                writer.write_event(Event::End(element)).map_err(malformed)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(malformed)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSLATED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff xmlns="urn:oasis:names:tc:xliff:document:2.0" version="2.0" srcLang="en-GB" trgLang="fr-FR">
  <file id="n12" original="Home">
    <notes>
      <note category="vendor">Reviewed by agency</note>
    </notes>
    <group id="g1">
      <unit id="12-title">
        <segment state="translated">
          <source>Welcome</source>
          <target>Bienvenue</target>
        </segment>
      </unit>
    </group>
    <unit id="12-body">
      <ignorable>
        <source>&lt;p&gt;</source>
      </ignorable>
      <segment id="s1">
        <source>Hello</source>
      </segment>
    </unit>
  </file>
</xliff>
"#;

    fn sample() -> XliffDocument {
        let mut document = XliffDocument::new("en-GB", "fr-FR");
        document.files.push(XliffFile {
            id: "n1".to_string(),
            original: Some("Home".to_string()),
            entries: vec![FileEntry::Unit(XliffUnit {
                id: "1-title".to_string(),
                name: Some("title".to_string()),
                parts: vec![UnitPart::Segment(Segment {
                    id: None,
                    state: Some(SegmentState::Initial),
                    source: "Fish & <chips>".to_string(),
                    target: None,
                })],
            })],
        });
        document
    }

    #[test]
    fn test_write_then_read() {
        let mut buffer = Vec::new();
        XliffLoader::write_to(&mut buffer, &sample()).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xliff"));
        assert!(text.contains(XLIFF_NAMESPACE));
        assert!(text.contains("&amp;"));
        assert!(!text.contains("<target"));

        let parsed = XliffLoader::read_from(buffer.as_slice()).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_reads_groups_and_notes() {
        let document = XliffLoader::read_from(TRANSLATED.as_bytes()).unwrap();
        assert_eq!(document.trg_lang.as_deref(), Some("fr-FR"));

        let ids: Vec<&str> = document.units().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["12-title", "12-body"]);

        let title = document.unit("12-title").unwrap();
        let segment = title.segments().next().unwrap();
        assert_eq!(segment.translation(), Some("Bienvenue"));
        assert_eq!(segment.state, Some(SegmentState::Translated));

        let body = document.unit("12-body").unwrap();
        assert!(body.has_ignorables());
        assert!(document.has_targets());
    }

    #[test]
    fn test_untranslated_document_has_no_targets() {
        let mut buffer = Vec::new();
        XliffLoader::write_to(&mut buffer, &sample()).unwrap();
        let parsed = XliffLoader::read_from(buffer.as_slice()).unwrap();
        assert!(!parsed.has_targets());
    }

    #[test]
    fn test_rejects_xliff_1_2() {
        let legacy = r#"<?xml version="1.0"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file source-language="en" datatype="plaintext" original="x"><body/></file>
</xliff>"#;
        let err = XliffLoader::read_from(legacy.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format(FormatIssue::NotXliff2 { ref found }) if found == "version 1.2"
        ));
    }

    #[test]
    fn test_rejects_other_root() {
        let err = XliffLoader::read_from("<html><body/></html>".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Format(FormatIssue::NotXliff2 { .. })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = XliffLoader::read_from("not xml at all".as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Format(FormatIssue::Malformed(_))));

        let err = XliffLoader::read_from([0xff, 0xfe, 0x00].as_slice()).unwrap_err();
        assert!(matches!(err, CodecError::Format(FormatIssue::Malformed(_))));
    }

    #[test]
    fn test_original_data_and_extensions_are_ignored() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<xliff xmlns="urn:oasis:names:tc:xliff:document:2.0" xmlns:mda="urn:oasis:names:tc:xliff:metadata:2.0"
       version="2.0" srcLang="en-GB" trgLang="fr-FR">
  <file id="n1">
    <skeleton href="home.skl"/>
    <mda:metadata><mda:metaGroup><mda:meta type="owner">web</mda:meta></mda:metaGroup></mda:metadata>
    <unit id="1-title">
      <originalData>
        <data id="d1">&lt;br/&gt;</data>
      </originalData>
      <segment>
        <source>Welcome</source>
        <target>Bienvenue</target>
      </segment>
    </unit>
  </file>
</xliff>"#;
        let document = XliffLoader::read_from(xml.as_bytes()).unwrap();

        let unit = document.unit("1-title").unwrap();
        assert_eq!(unit.parts.len(), 1);
        assert_eq!(unit.segments().next().unwrap().translation(), Some("Bienvenue"));
    }

    #[test]
    fn test_inline_codes_are_kept_as_text() {
        let xml = r#"<xliff xmlns="urn:oasis:names:tc:xliff:document:2.0" version="2.0" srcLang="en-GB" trgLang="fr-FR">
  <file id="n1">
    <unit id="1-body">
      <originalData><data id="d1">&lt;b&gt;</data></originalData>
      <segment id="s1">
        <source>Hello <ph id="1" dataRef="d1"/> and <pc id="2">bold &amp; brave</pc></source>
        <target>Bonjour <ph id="1" dataRef="d1" /> et <pc id="2">gras &amp; brave</pc></target>
      </segment>
    </unit>
  </file>
</xliff>"#;
        let document = XliffLoader::read_from(xml.as_bytes()).unwrap();
        let segment = document.unit("1-body").unwrap().segments().next().unwrap().clone();

        assert_eq!(
            segment.source,
            r#"Hello <ph id="1" dataRef="d1"/> and <pc id="2">bold & brave</pc>"#
        );
        assert_eq!(
            segment.translation(),
            Some(r#"Bonjour <ph id="1" dataRef="d1"/> et <pc id="2">gras & brave</pc>"#)
        );
    }

    #[test]
    fn test_normalize_keeps_modelled_documents_unchanged() {
        let normalized = normalize(TRANSLATED).unwrap();
        let direct: XliffDocument = quick_xml::de::from_str(TRANSLATED).unwrap();
        let via_normalize: XliffDocument = quick_xml::de::from_str(&normalized).unwrap();
        assert_eq!(direct, via_normalize);
    }
}
