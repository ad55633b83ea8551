//! File drop provider against a real directory.

mod common;

use common::*;
use transjob::codec::{FileEntry, UnitPart, XliffDocument, XliffLoader, XLIFF_NAMESPACE};
use transjob::provider::FileDropOptions;
use transjob::{
    BatchCancel, BatchOrchestrator, FileStore, FormatIssue, JobError, JobStatus, LocalFileStore,
    StorageError,
};

fn outbound_path(provider_properties: &str) -> String {
    let options: FileDropOptions = serde_json::from_str(provider_properties).unwrap();
    options.file_name.unwrap()
}

fn fill_targets(document: &mut XliffDocument, prefix: &str) {
    for file in &mut document.files {
        for entry in &mut file.entries {
            let FileEntry::Unit(unit) = entry else { continue };
            for part in &mut unit.parts {
                if let UnitPart::Segment(segment) = part {
                    segment.target = Some(format!("{prefix}{}", segment.source));
                }
            }
        }
    }
}

#[tokio::test]
async fn test_check_before_translation_is_not_ready() {
    let harness = TestHarness::on_disk();
    let job = harness
        .service
        .create_job(sample_request("Waiting room", "sv-SE", harness.filedrop_key()))
        .await
        .unwrap();
    let submitted = harness.service.submit(job.key).await.unwrap();

    let path = outbound_path(&submitted.provider_properties);
    let key = job.key.simple().to_string();
    assert_eq!(path, format!("/media/filedrop/Waiting-room-sv-SE-{}.xlf", &key[..8]));
    assert!(harness
        .temp_path()
        .unwrap()
        .join(path.trim_start_matches('/'))
        .is_file());

    assert!(matches!(
        harness.service.check(job.key).await,
        Err(JobError::NotReady(_))
    ));
    assert_eq!(
        harness.service.get(job.key).unwrap().status,
        JobStatus::Submitted
    );
}

#[tokio::test]
async fn test_translator_round_trip_on_disk() {
    let harness = TestHarness::on_disk();
    let job = harness
        .service
        .create_job(sample_request("Round trip", "fi-FI", harness.filedrop_key()))
        .await
        .unwrap();
    let submitted = harness.service.submit(job.key).await.unwrap();
    let path = outbound_path(&submitted.provider_properties);

    let xml = harness.read_file(&path);
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains(XLIFF_NAMESPACE));
    assert!(xml.contains("srcLang=\"en-GB\""));
    assert!(xml.contains("trgLang=\"fi-FI\""));

    let mut document = XliffLoader::read_from(xml.as_bytes()).unwrap();
    let ids: Vec<String> = document.units().iter().map(|u| u.id.clone()).collect();
    assert_eq!(ids, vec!["1001-title", "1001-body", "1002-title"]);

    // translate everything except the contact title
    for file in &mut document.files {
        for entry in &mut file.entries {
            let FileEntry::Unit(unit) = entry else { continue };
            if unit.id == "1002-title" {
                continue;
            }
            for part in &mut unit.parts {
                if let UnitPart::Segment(segment) = part {
                    segment.target = Some(segment.source.to_uppercase());
                }
            }
        }
    }
    harness.write_file(&path, &XliffLoader::to_string(&document).unwrap());

    let checked = harness.service.check(job.key).await.unwrap();
    assert_eq!(checked.status, JobStatus::Submitted);
    assert_eq!(checked.translated_count(), 2);
    assert_eq!(
        checked.unit("1001-title").unwrap().target.as_deref(),
        Some("WELCOME")
    );
    assert_eq!(
        checked.unit("1001-body").unwrap().target.as_deref(),
        Some("<h1>HELLO</h1><p>OUR <B>NEW</B> SITE</p>")
    );
    assert!(checked.unit("1002-title").unwrap().target.is_none());

    // sources survive the trip untouched
    for (before, after) in job.units.iter().zip(&checked.units) {
        assert_eq!(before.id(), after.id());
        assert_eq!(before.source, after.source);
    }

    assert!(matches!(
        harness.service.approve(job.key).await,
        Err(JobError::NotReady(_))
    ));
}

#[tokio::test]
async fn test_returned_xliff_12_is_rejected() {
    let harness = TestHarness::on_disk();
    let job = harness
        .service
        .create_job(sample_request("Legacy", "da-DK", harness.filedrop_key()))
        .await
        .unwrap();
    let submitted = harness.service.submit(job.key).await.unwrap();
    let path = outbound_path(&submitted.provider_properties);

    harness.write_file(
        &path,
        r#"<?xml version="1.0"?>
<xliff version="1.2" xmlns="urn:oasis:names:tc:xliff:document:1.2">
  <file original="x" source-language="en-GB" target-language="da-DK" datatype="plaintext">
    <body><trans-unit id="1001-title"><source>Welcome</source><target>Velkommen</target></trans-unit></body>
  </file>
</xliff>"#,
    );

    let err = harness.service.check(job.key).await.unwrap_err();
    assert!(
        matches!(err, JobError::Format(FormatIssue::NotXliff2 { .. })),
        "got {err}"
    );
    assert_eq!(harness.service.get(job.key).unwrap(), submitted);
}

#[tokio::test]
async fn test_batch_without_culture_in_name_keeps_files_apart() {
    let harness = TestHarness::on_disk();
    let set = SetBuilder::new(12, harness.filedrop_key())
        .site(1, "fr-FR")
        .site(2, "de-DE")
        .auto_send(true)
        .build();
    let picked = pick_all(&set);
    let mut request = batch_request(set, picked);
    request.name_template = "Spring launch {date}".to_string();

    let report = BatchOrchestrator::new(harness.service.clone())
        .run(request, BatchCancel::new())
        .await
        .unwrap();
    assert_eq!(report.completed, 2);

    let jobs: Vec<_> = report.jobs().cloned().collect();
    assert_eq!(jobs[0].name, jobs[1].name);
    let paths: Vec<String> = jobs
        .iter()
        .map(|job| outbound_path(&job.provider_properties))
        .collect();
    assert_ne!(paths[0], paths[1]);

    for (job, path) in jobs.iter().zip(&paths) {
        let mut document = XliffLoader::read_from(harness.read_file(path).as_bytes()).unwrap();
        assert_eq!(document.trg_lang.as_deref(), Some(job.target_culture.as_str()));
        fill_targets(&mut document, &format!("[{}] ", job.target_culture));
        harness.write_file(path, &XliffLoader::to_string(&document).unwrap());
    }

    for job in &jobs {
        let checked = harness.service.check(job.key).await.unwrap();
        let expected = format!("[{}] Welcome", job.target_culture);
        assert_eq!(
            checked.unit("1001-title").unwrap().target.as_deref(),
            Some(expected.as_str())
        );
    }
}

#[tokio::test]
async fn test_document_for_another_culture_is_not_merged() {
    let harness = TestHarness::on_disk();
    let french = harness
        .service
        .create_job(sample_request("Spring launch", "fr-FR", harness.filedrop_key()))
        .await
        .unwrap();
    let german = harness
        .service
        .create_job(sample_request("Spring launch", "de-DE", harness.filedrop_key()))
        .await
        .unwrap();
    let french = harness.service.submit(french.key).await.unwrap();
    let german = harness.service.submit(german.key).await.unwrap();

    // the German translation lands where the French job looks
    let german_path = outbound_path(&german.provider_properties);
    let mut document =
        XliffLoader::read_from(harness.read_file(&german_path).as_bytes()).unwrap();
    fill_targets(&mut document, "[de-DE] ");
    harness.write_file(
        &outbound_path(&french.provider_properties),
        &XliffLoader::to_string(&document).unwrap(),
    );

    let err = harness.service.check(french.key).await.unwrap_err();
    assert!(
        matches!(err, JobError::Format(FormatIssue::LanguageMismatch { .. })),
        "got {err}"
    );
    let stored = harness.service.get(french.key).unwrap();
    assert_eq!(stored, french);
    assert!(stored.units.iter().all(|unit| unit.target.is_none()));
}

#[test]
fn test_local_store_rejects_parent_segments() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = LocalFileStore::new(dir.path().join("root"));

    for path in ["../escape.xlf", "/media/../../escape.xlf", "media/..\\escape.xlf"] {
        assert!(
            matches!(
                store.save(path, &mut "x".as_bytes()),
                Err(StorageError::InvalidPath(_))
            ),
            "{path} was accepted"
        );
    }
    assert!(!dir.path().join("escape.xlf").exists());
}
