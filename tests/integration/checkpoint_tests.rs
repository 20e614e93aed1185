use serde_json::Value;
use stagedupe::checkpoint::{CheckpointError, StateStore};
use stagedupe::output::text::render_scan;
use stagedupe::output::ScanReport;
use stagedupe::pipeline::PipelineState;
use stagedupe::scanner::is_fingerprint;
use stagedupe::{normalize_root, scan, ScanSettings};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_completed_scan_document_format() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    fs::write(data.path().join("a"), "same").unwrap();
    fs::write(data.path().join("b"), "same").unwrap();
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt.clone());
    let outcome = scan(&settings, None, None);
    assert!(outcome.is_completed());
    assert!(outcome.checkpointed());

    let doc: Value = serde_json::from_str(&fs::read_to_string(&ckpt).unwrap()).unwrap();
    let state = &doc[&root]["state"];

    assert_eq!(state["cursor"], 0);
    assert_eq!(state["rootPath"], Value::String(root.clone()));
    assert!(state["lastError"].is_null());
    assert_eq!(state["duplicateGroups"].as_array().unwrap().len(), 1);

    let index = state["fingerprintIndex"].as_object().unwrap();
    assert_eq!(index.len(), 1);
    let (fingerprint, paths) = index.iter().next().unwrap();
    assert!(is_fingerprint(fingerprint));
    assert_eq!(paths.as_array().unwrap().len(), 2);
}

#[test]
fn test_report_states_whether_checkpoint_was_saved() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    fs::write(data.path().join("a"), "same").unwrap();
    let ckpt = work.path().join("ckpt.json");

    let mut settings = ScanSettings::new(normalize_root(data.path()));
    let unsaved = scan(&settings, None, None);
    let report = ScanReport::from_outcome(&unsaved, None);
    assert!(!report.checkpoint_saved);
    assert!(render_scan(&report, false).contains("State not saved"));

    settings.checkpoint = Some(ckpt.clone());
    let saved = scan(&settings, None, None);
    let report = ScanReport::from_outcome(&saved, Some(ckpt.as_path()));
    assert!(report.checkpoint_saved);
    assert!(render_scan(&report, false)
        .contains(&format!("State saved at: {}", ckpt.display())));
}

#[test]
fn test_scans_of_two_roots_share_one_document() {
    let one = tempdir().unwrap();
    let two = tempdir().unwrap();
    let work = tempdir().unwrap();
    fs::write(one.path().join("x"), "1").unwrap();
    fs::write(two.path().join("y"), "2").unwrap();
    let ckpt = work.path().join("ckpt.json");

    for dir in [&one, &two] {
        let mut settings = ScanSettings::new(normalize_root(dir.path()));
        settings.checkpoint = Some(ckpt.clone());
        assert!(scan(&settings, None, None).is_completed());
    }

    let store = StateStore::new(Some(ckpt));
    let roots: Vec<String> = store
        .load_document()
        .states()
        .into_iter()
        .map(|(root, _)| root)
        .collect();
    assert_eq!(roots.len(), 2);
    assert!(roots.contains(&normalize_root(one.path())));
    assert!(roots.contains(&normalize_root(two.path())));
}

#[test]
fn test_foreign_keys_survive_a_scan() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    let ckpt = work.path().join("ckpt.json");
    fs::write(&ckpt, r#"{"version": 3, "/elsewhere": {"state": {"cursor": 1}}}"#).unwrap();

    let mut settings = ScanSettings::new(normalize_root(data.path()));
    settings.checkpoint = Some(ckpt.clone());
    assert!(scan(&settings, None, None).is_completed());

    let doc: Value = serde_json::from_str(&fs::read_to_string(&ckpt).unwrap()).unwrap();
    assert_eq!(doc["version"], 3);
    assert_eq!(doc["/elsewhere"]["state"]["cursor"], 1);
}

#[test]
fn test_corrupt_document_is_replaced_on_scan() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    let ckpt = work.path().join("ckpt.json");
    fs::write(&ckpt, "\u{0}\u{0}garbage").unwrap();
    let root = normalize_root(data.path());

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt.clone());
    settings.resume = true;
    let outcome = scan(&settings, None, None);

    assert!(outcome.is_completed());
    let store = StateStore::new(Some(ckpt));
    assert!(store.read_document().is_ok());
    assert_eq!(store.load(&root).unwrap().cursor, 0);
}

#[test]
fn test_unwritable_destination_halts_first_transition() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    fs::write(data.path().join("a"), "same").unwrap();
    // A directory where the file should be
    let ckpt = work.path().join("ckpt.json");
    fs::create_dir(&ckpt).unwrap();

    let mut settings = ScanSettings::new(normalize_root(data.path()));
    settings.checkpoint = Some(ckpt);
    let outcome = scan(&settings, None, None);

    assert!(!outcome.is_completed());
    let state = outcome.state();
    assert_eq!(state.cursor, 0);
    assert!(state.fingerprint_index.is_none());
    assert!(state
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("Checkpoint write failed"));
}

#[test]
fn test_excluded_checkpoint_is_not_indexed() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a"), "payload").unwrap();
    let root = normalize_root(data.path());
    let ckpt = data.path().join("ckpt.json");

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt.clone());
    settings.exclude_checkpoint = true;

    // Second run sees the file written by the first
    assert!(scan(&settings, None, None).is_completed());
    let outcome = scan(&settings, None, None);

    let index = outcome.state().fingerprint_index.as_ref().unwrap();
    let ckpt = normalize_root(&ckpt);
    assert!(index.values().flatten().all(|p| *p != ckpt));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_status_read_is_strict() {
    let work = tempdir().unwrap();
    let ckpt = work.path().join("ckpt.json");
    fs::write(&ckpt, "[]").unwrap();
    let store = StateStore::new(Some(ckpt));

    assert!(matches!(
        store.read_document(),
        Err(CheckpointError::Corrupt { .. })
    ));
    assert!(store.load_document().is_empty());
    assert_eq!(store.load("/any"), None::<PipelineState>);
}
