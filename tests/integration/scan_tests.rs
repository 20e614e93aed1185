use stagedupe::duplicates::{default_stages, BuildIndex};
use stagedupe::pipeline::{ErrorKind, PipelineRunner, PipelineState};
use stagedupe::scanner::{is_fingerprint, WalkerConfig};
use stagedupe::{normalize_root, scan, ScanSettings};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn settings_for(root: &Path) -> ScanSettings {
    ScanSettings::new(normalize_root(root))
}

fn rel(root: &Path, name: &str) -> String {
    Path::new(&normalize_root(root))
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let outcome = scan(&settings_for(dir.path()), None, None);

    assert!(outcome.is_completed());
    let state = outcome.state();
    assert_eq!(state.cursor, 0);
    assert_eq!(state.fingerprint_index.as_ref().map(|i| i.len()), Some(0));
    assert_eq!(state.duplicate_groups, Some(Vec::new()));
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "content a").unwrap();
    fs::write(dir.path().join("b.txt"), "content b").unwrap();
    fs::write(dir.path().join("c.txt"), "content c").unwrap();

    let outcome = scan(&settings_for(dir.path()), None, None);

    assert!(outcome.is_completed());
    assert!(outcome.state().groups().is_empty());
    assert_eq!(outcome.state().fingerprint_index.as_ref().unwrap().len(), 3);
}

#[test]
fn test_scan_nested_duplicates() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("x/y")).unwrap();
    fs::write(root.join("top.bin"), "alpha").unwrap();
    fs::write(root.join("x/mid.bin"), "alpha").unwrap();
    fs::write(root.join("x/y/deep.bin"), "alpha").unwrap();
    fs::write(root.join("x/y/pair1"), "beta").unwrap();
    fs::write(root.join("pair2"), "beta").unwrap();
    fs::write(root.join("lonely"), "gamma").unwrap();

    let outcome = scan(&settings_for(root), None, None);
    let groups = outcome.state().groups();

    assert_eq!(
        groups,
        &[
            vec![rel(root, "pair2"), rel(root, "x/y/pair1")],
            vec![rel(root, "top.bin"), rel(root, "x/mid.bin"), rel(root, "x/y/deep.bin")],
        ]
    );
}

#[test]
fn test_empty_files_are_duplicates_of_each_other() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("e1"), "").unwrap();
    fs::write(dir.path().join("e2"), "").unwrap();

    let outcome = scan(&settings_for(dir.path()), None, None);
    let state = outcome.state();

    assert_eq!(state.groups().len(), 1);
    assert!(state
        .fingerprint_index
        .as_ref()
        .unwrap()
        .contains_key("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
}

#[test]
fn test_rescan_of_unchanged_tree_is_identical() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        fs::write(dir.path().join(format!("f{}", i)), format!("{}", i % 4)).unwrap();
    }

    let first = scan(&settings_for(dir.path()), None, None);
    let second = scan(&settings_for(dir.path()), None, None);

    assert_eq!(first.state().groups(), second.state().groups());
    assert_eq!(
        first.state().fingerprint_index,
        second.state().fingerprint_index
    );
    assert_eq!(first.state().groups().len(), 4);
}

#[test]
fn test_io_threads_do_not_change_results() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        fs::write(dir.path().join(format!("f{:02}", i)), vec![b'x'; i % 5]).unwrap();
    }

    let sequential = scan(&settings_for(dir.path()), None, None);
    let mut settings = settings_for(dir.path());
    settings.io_threads = 8;
    let parallel = scan(&settings, None, None);

    assert_eq!(sequential.state(), parallel.state());
}

#[test]
fn test_index_keys_are_fingerprints() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "one").unwrap();
    fs::write(dir.path().join("b"), "two").unwrap();

    let outcome = scan(&settings_for(dir.path()), None, None);

    let index = outcome.state().fingerprint_index.as_ref().unwrap();
    assert!(index.keys().all(|k| is_fingerprint(k)));
}

#[test]
fn test_missing_root_halts_in_first_stage() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");

    let outcome = scan(&settings_for(&missing), None, None);

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Io));
    let state = outcome.state();
    assert_eq!(state.cursor, 0);
    assert!(state.fingerprint_index.is_none());
    assert!(state.last_error.as_deref().unwrap().contains("gone"));
    assert!(state.groups().is_empty());
}

#[test]
fn test_rootless_state_reports_missing_input() {
    let runner = PipelineRunner::new(default_stages(BuildIndex::default()));

    let outcome = runner.run(PipelineState::default());

    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingInput));
    assert_eq!(
        outcome.state().last_error.as_deref(),
        Some("Missing required input: rootPath")
    );
}

#[test]
fn test_resume_at_detect_without_index_reports_missing_input() {
    let runner = PipelineRunner::new(default_stages(BuildIndex::default()));
    let mut state = PipelineState::new("/anywhere");
    state.cursor = 1;

    let outcome = runner.run(state);

    assert_eq!(outcome.error_kind(), Some(ErrorKind::MissingInput));
    assert_eq!(
        outcome.state().last_error.as_deref(),
        Some("Missing required input: fingerprintIndex")
    );
}

#[cfg(unix)]
#[test]
fn test_symlinks_skipped_by_default() {
    use std::os::unix::fs::symlink;

    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("real"), "data").unwrap();
    symlink(root.join("real"), root.join("link")).unwrap();

    let outcome = scan(&settings_for(root), None, None);
    assert!(outcome.state().groups().is_empty());

    let mut settings = settings_for(root);
    settings.follow_symlinks = true;
    let outcome = scan(&settings, None, None);
    assert_eq!(
        outcome.state().groups(),
        &[vec![rel(root, "link"), rel(root, "real")]]
    );
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_stops_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::write(&locked, "secret").unwrap();
    fs::write(dir.path().join("open"), "fine").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway
    if fs::File::open(&locked).is_ok() {
        return;
    }

    let stage = BuildIndex::default().with_walker_config(WalkerConfig::default());
    let outcome = PipelineRunner::new(default_stages(stage))
        .run(PipelineState::new(normalize_root(dir.path())));

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Io));
    assert!(outcome.state().last_error.as_deref().unwrap().contains("locked"));
    assert!(outcome.state().fingerprint_index.is_none());
}
