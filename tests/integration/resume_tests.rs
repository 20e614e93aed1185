use stagedupe::checkpoint::StateStore;
use stagedupe::duplicates::{BuildIndex, DetectDuplicates};
use stagedupe::output::ScanReport;
use stagedupe::pipeline::{ErrorKind, PipelineRunner, PipelineState, Stage, StageError};
use stagedupe::scanner::ScanError;
use stagedupe::{normalize_root, scan, ScanSettings};
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

/// Stand-in for a run killed between stages.
struct Crash;

impl Stage for Crash {
    fn name(&self) -> &'static str {
        "crash"
    }

    fn execute(&self, _state: &mut PipelineState) -> Result<(), StageError> {
        Err(ScanError::Interrupted.into())
    }
}

fn tree_with_pair(root: &Path) {
    fs::write(root.join("a"), "same").unwrap();
    fs::write(root.join("b"), "same").unwrap();
}

#[test]
fn test_resume_skips_completed_index_stage() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    tree_with_pair(data.path());
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");
    let store = StateStore::new(Some(ckpt.clone()));

    // Index, then die before detection
    let crashed = PipelineRunner::new(vec![Box::new(BuildIndex::default()), Box::new(Crash)])
        .with_checkpointer(&store)
        .run(PipelineState::new(root.clone()));
    assert_eq!(crashed.error_kind(), Some(ErrorKind::Interrupted));

    let stored = store.load(&root).unwrap();
    assert_eq!(stored.cursor, 1);
    assert!(stored.last_error.is_none());

    // A file added after indexing is invisible to the resumed run
    fs::write(data.path().join("c"), "same").unwrap();

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt);
    settings.resume = true;
    let resumed = scan(&settings, None, None);

    assert!(resumed.is_completed());
    assert_eq!(resumed.state().cursor, 0);
    assert_eq!(resumed.state().groups()[0].len(), 2);
    assert_eq!(store.load(&root).unwrap().cursor, 0);
}

#[test]
fn test_fresh_scan_ignores_stored_progress() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    tree_with_pair(data.path());
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");
    let store = StateStore::new(Some(ckpt.clone()));

    let mut stale = PipelineState::new(root.clone());
    stale.cursor = 1;
    stale.fingerprint_index = Some(Default::default());
    store.save(&root, &stale).unwrap();

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt);
    let outcome = scan(&settings, None, None);

    assert_eq!(outcome.state().groups().len(), 1);
}

#[test]
fn test_interrupted_scan_keeps_previous_checkpoint() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    tree_with_pair(data.path());
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt.clone());
    assert!(scan(&settings, None, None).is_completed());
    let before = fs::read_to_string(&ckpt).unwrap();

    let interrupted = scan(&settings, Some(Arc::new(AtomicBool::new(true))), None);

    assert_eq!(interrupted.error_kind(), Some(ErrorKind::Interrupted));
    assert_eq!(interrupted.state().last_error.as_deref(), Some("Scan interrupted"));
    assert_eq!(fs::read_to_string(&ckpt).unwrap(), before);
}

#[test]
fn test_resume_after_failure_clears_error_and_completes() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    tree_with_pair(data.path());
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");
    let store = StateStore::new(Some(ckpt.clone()));

    // A checkpoint written by an older tool that kept the error
    let mut halted = PipelineState::new(root.clone());
    halted.last_error = Some("Permission denied: /old".into());
    store.save(&root, &halted).unwrap();

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt);
    settings.resume = true;
    let outcome = scan(&settings, None, None);

    assert!(outcome.is_completed());
    assert!(outcome.state().last_error.is_none());
    assert_eq!(outcome.state().groups().len(), 1);
}

#[test]
fn test_resume_without_stored_state_runs_from_start() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    tree_with_pair(data.path());

    let mut settings = ScanSettings::new(normalize_root(data.path()));
    settings.checkpoint = Some(work.path().join("never-written.json"));
    settings.resume = true;

    let outcome = scan(&settings, None, None);

    assert!(outcome.is_completed());
    assert_eq!(outcome.state().groups().len(), 1);
}

#[test]
fn test_detect_only_pipeline_from_stored_index() {
    let work = tempdir().unwrap();
    let store = StateStore::new(Some(work.path().join("ckpt.json")));

    let mut state = PipelineState::new("/virtual");
    state.fingerprint_index = Some(
        [
            ("h1".to_string(), vec!["b".to_string(), "a".to_string()]),
            ("h2".to_string(), vec!["c".to_string()]),
        ]
        .into_iter()
        .collect(),
    );

    let outcome = PipelineRunner::new(vec![Box::new(DetectDuplicates)])
        .with_checkpointer(&store)
        .run(state);

    assert_eq!(
        outcome.state().groups(),
        &[vec!["a".to_string(), "b".to_string()]]
    );
    assert_eq!(store.load("/virtual").unwrap(), outcome.into_state());
}

#[test]
fn test_resume_at_end_rebuilds_groups_from_index() {
    let data = tempdir().unwrap();
    let work = tempdir().unwrap();
    let root = normalize_root(data.path());
    let ckpt = work.path().join("ckpt.json");
    // Snapshot taken after the last stage, with groups that contradict the index
    let document = serde_json::json!({
        root.clone(): {
            "state": {
                "cursor": 2,
                "fingerprintIndex": {},
                "duplicateGroups": [["/solo"], []],
                "lastError": null,
                "rootPath": root.clone(),
            }
        }
    });
    fs::write(&ckpt, document.to_string()).unwrap();

    let mut settings = ScanSettings::new(root.clone());
    settings.checkpoint = Some(ckpt.clone());
    settings.resume = true;
    let outcome = scan(&settings, None, None);

    assert!(outcome.is_completed());
    assert!(outcome.state().groups().is_empty());
    assert_eq!(outcome.state().cursor, 0);

    let report = ScanReport::from_outcome(&outcome, Some(ckpt.as_path()));
    assert!(!report.has_duplicates());
    assert_eq!(
        StateStore::new(Some(ckpt)).load(&root).unwrap().duplicate_groups,
        Some(Vec::new())
    );
}
