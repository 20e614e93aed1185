use clap::Parser;
use stagedupe::checkpoint::StateStore;
use stagedupe::cli::Cli;
use stagedupe::error::{ExitCode, PipelineFailure};
use stagedupe::pipeline::{ErrorKind, PipelineState};
use stagedupe::{normalize_root, run_app};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Empty config file so the user's own config never leaks into tests.
fn isolated_config() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "").unwrap();
    dir
}

fn run(config: &Path, argv: &[&str]) -> anyhow::Result<ExitCode> {
    let config = config.join("config.toml");
    let mut full = vec![
        "stagedupe",
        "-q",
        "--no-color",
        "--config",
        config.to_str().unwrap(),
    ];
    full.extend_from_slice(argv);
    run_app(Cli::try_parse_from(full).unwrap())
}

#[test]
fn test_scan_with_duplicates_exits_success() {
    let cfg = isolated_config();
    let data = tempdir().unwrap();
    fs::write(data.path().join("a"), "same").unwrap();
    fs::write(data.path().join("b"), "same").unwrap();

    let code = run(
        cfg.path(),
        &["scan", data.path().to_str().unwrap(), "--no-progress", "--output", "json"],
    )
    .unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_scan_without_duplicates_exits_two() {
    let cfg = isolated_config();
    let data = tempdir().unwrap();
    fs::write(data.path().join("a"), "one").unwrap();

    let code = run(cfg.path(), &["scan", data.path().to_str().unwrap()]).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(code.as_i32(), 2);
}

#[test]
fn test_scan_of_missing_root_is_pipeline_failure() {
    let cfg = isolated_config();
    let data = tempdir().unwrap();
    let missing = data.path().join("nope");

    let err = run(cfg.path(), &["scan", missing.to_str().unwrap()]).unwrap_err();

    let failure = err.downcast_ref::<PipelineFailure>().unwrap();
    assert_eq!(failure.kind, ErrorKind::Io);
    assert_eq!(failure.stage, 1);
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_resume_without_checkpoint_is_rejected() {
    let cfg = isolated_config();
    let data = tempdir().unwrap();

    let err = run(cfg.path(), &["scan", data.path().to_str().unwrap(), "--resume"]).unwrap_err();

    assert!(err.to_string().contains("--resume"));
    assert!(err.downcast_ref::<PipelineFailure>().is_none());
}

#[test]
fn test_checkpoint_from_config_file() {
    let cfg = tempdir().unwrap();
    let work = tempdir().unwrap();
    let data = tempdir().unwrap();
    fs::write(data.path().join("a"), "x").unwrap();
    let ckpt = work.path().join("from-config.json");
    fs::write(
        cfg.path().join("config.toml"),
        format!("checkpoint = {:?}\n", ckpt.to_str().unwrap()),
    )
    .unwrap();

    run(cfg.path(), &["scan", data.path().to_str().unwrap()]).unwrap();

    let store = StateStore::new(Some(ckpt));
    assert!(store.load(&normalize_root(data.path())).is_some());
}

#[test]
fn test_status_and_forget() {
    let cfg = isolated_config();
    let work = tempdir().unwrap();
    let ckpt = work.path().join("ckpt.json");
    let store = StateStore::new(Some(ckpt.clone()));
    let data = tempdir().unwrap();
    let root = normalize_root(data.path());
    store.save(&root, &PipelineState::new(root.clone())).unwrap();
    store.save("/kept", &PipelineState::new("/kept")).unwrap();
    let ckpt_arg = ckpt.to_str().unwrap();

    assert_eq!(
        run(cfg.path(), &["status", "--checkpoint", ckpt_arg, "--output", "json"]).unwrap(),
        ExitCode::Success
    );

    run(
        cfg.path(),
        &["forget", data.path().to_str().unwrap(), "--checkpoint", ckpt_arg],
    )
    .unwrap();

    assert!(store.load(&root).is_none());
    assert!(store.load("/kept").is_some());
}

#[test]
fn test_status_of_missing_file_is_error() {
    let cfg = isolated_config();
    let work = tempdir().unwrap();
    let ckpt = work.path().join("absent.json");

    let err = run(cfg.path(), &["status", "--checkpoint", ckpt.to_str().unwrap()]).unwrap_err();

    assert!(err.to_string().contains("No checkpoint file"));
}

#[test]
fn test_status_of_corrupt_file_is_error() {
    let cfg = isolated_config();
    let work = tempdir().unwrap();
    let ckpt = work.path().join("bad.json");
    fs::write(&ckpt, "{oops").unwrap();

    let err = run(cfg.path(), &["status", "--checkpoint", ckpt.to_str().unwrap()]).unwrap_err();

    assert!(err.to_string().contains("Corrupt checkpoint"));
}

#[test]
fn test_config_subcommand() {
    let cfg = isolated_config();
    assert_eq!(run(cfg.path(), &["config"]).unwrap(), ExitCode::Success);
}
