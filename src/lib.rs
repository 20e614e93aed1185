//! stagedupe - resumable duplicate file finder
//!
//! Scans a directory tree, fingerprints every regular file with SHA-1 and
//! reports groups of identical files. The scan runs as a staged pipeline
//! that checkpoints its state after every stage, so an interrupted scan can
//! be resumed from the last completed stage.
//!
//! # Library usage
//!
//! ```no_run
//! use stagedupe::{scan, ScanSettings};
//!
//! let settings = ScanSettings::new("/data");
//! let outcome = scan(&settings, None, None);
//! for group in outcome.state().groups() {
//!     println!("{:?}", group);
//! }
//! ```

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::checkpoint::{CheckpointError, StateStore};
use crate::cli::{Cli, Commands, ForgetArgs, OutputFormat, ScanArgs, StatusArgs};
use crate::config::Config;
use crate::duplicates::{default_stages, BuildIndex};
use crate::error::{ExitCode, PipelineFailure};
use crate::output::{ScanReport, StatusReport};
use crate::pipeline::{PipelineRunner, PipelineState, RunOutcome};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::WalkerConfig;

/// Resolved options for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Root to scan; also the checkpoint key
    pub root: String,
    /// Checkpoint destination
    pub checkpoint: Option<PathBuf>,
    /// Start from the stored checkpoint for `root`
    pub resume: bool,
    /// Leave the checkpoint file out of the scan
    pub exclude_checkpoint: bool,
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Hashing workers
    pub io_threads: usize,
}

impl ScanSettings {
    /// Defaults for scanning `root` without checkpoints.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            root: root.into(),
            checkpoint: None,
            resume: false,
            exclude_checkpoint: defaults.exclude_checkpoint,
            follow_symlinks: defaults.follow_symlinks,
            io_threads: defaults.io_threads,
        }
    }

    /// Merge CLI flags over the loaded configuration.
    ///
    /// # Errors
    ///
    /// Fails when `--resume` is given with no checkpoint destination.
    pub fn resolve(args: &ScanArgs, config: &Config) -> Result<Self> {
        let checkpoint = args.checkpoint.clone().or_else(|| config.checkpoint.clone());
        if args.resume && checkpoint.is_none() {
            bail!("--resume needs a checkpoint destination (--checkpoint or `checkpoint` in the config file)");
        }

        Ok(Self {
            root: normalize_root(&args.path),
            checkpoint,
            resume: args.resume,
            exclude_checkpoint: args.exclude_checkpoint || config.exclude_checkpoint,
            follow_symlinks: args.follow_symlinks || config.follow_symlinks,
            io_threads: args
                .io_threads
                .map_or(config.io_threads, usize::from)
                .max(1),
        })
    }

    fn walker_config(&self) -> WalkerConfig {
        let excluded = match (&self.checkpoint, self.exclude_checkpoint) {
            (Some(path), true) => vec![path.clone()],
            _ => Vec::new(),
        };
        WalkerConfig::new(self.follow_symlinks, excluded)
    }
}

/// Absolute, canonical form of `path` where it can be resolved.
#[must_use]
pub fn normalize_root(path: &Path) -> String {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// The state a scan of `root` starts from.
///
/// When resuming, the stored state is reused as is except that a stale
/// `lastError` from the halted run is cleared. Without a stored state, or
/// without `resume`, the scan starts fresh.
#[must_use]
pub fn initial_state(store: &StateStore, root: &str, resume: bool) -> PipelineState {
    if !resume {
        return PipelineState::new(root);
    }

    match store.load(root) {
        Some(mut state) => {
            if let Some(previous) = state.last_error.take() {
                log::info!("Previous run of {} failed: {}", root, previous);
            }
            state.root_path = Some(root.to_string());
            log::info!("Resuming scan of {} at stage {}", root, state.cursor + 1);
            state
        }
        None => {
            log::info!("No checkpoint stored for {}; starting a fresh scan", root);
            PipelineState::new(root)
        }
    }
}

/// Run the standard two-stage scan described by `settings`.
#[must_use]
pub fn scan(
    settings: &ScanSettings,
    shutdown: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> RunOutcome {
    let store = StateStore::new(settings.checkpoint.clone());

    let mut build = BuildIndex::default()
        .with_walker_config(settings.walker_config())
        .with_io_threads(settings.io_threads);
    if let Some(flag) = shutdown {
        build = build.with_shutdown_flag(flag);
    }
    if let Some(callback) = progress {
        build = build.with_progress(callback);
    }

    let runner = PipelineRunner::new(default_stages(build)).with_checkpointer(&store);
    let state = initial_state(&store, &settings.root, settings.resume);
    runner.run(state)
}

/// Entry point for the binary.
///
/// # Errors
///
/// Configuration problems, unreadable checkpoint files for `status` and
/// `forget`, and halted scans (as [`PipelineFailure`]).
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let color = !cli.no_color && std::io::stdout().is_terminal();
    if !color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan(args) => run_scan(&args, &config, cli.quiet, color),
        Commands::Status(args) => run_status(&args, &config, color),
        Commands::Forget(args) => run_forget(&args, &config),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool, color: bool) -> Result<ExitCode> {
    let settings = ScanSettings::resolve(args, config)?;
    log::debug!("Scan settings: {:?}", settings);

    let handler = signal::install_handler()?;
    let progress: Option<Arc<dyn ProgressCallback>> = if quiet || args.no_progress {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    };

    let outcome = scan(&settings, Some(handler.flag()), progress);
    let report = ScanReport::from_outcome(&outcome, settings.checkpoint.as_deref());

    let mut stdout = std::io::stdout().lock();
    match args.output {
        OutputFormat::Json => output::json::write_to(&report, &mut stdout)?,
        OutputFormat::Text if outcome.is_completed() => {
            stdout.write_all(output::text::render_scan(&report, color).as_bytes())?;
        }
        // The error path reports a halted text scan
        OutputFormat::Text => {}
    }
    stdout.flush()?;

    match PipelineFailure::from_outcome(&outcome) {
        Some(failure) => Err(failure.into()),
        None => Ok(ExitCode::for_outcome(&outcome)),
    }
}

fn checkpoint_path(explicit: Option<&PathBuf>, config: &Config) -> Result<PathBuf> {
    explicit
        .or(config.checkpoint.as_ref())
        .cloned()
        .context("No checkpoint file given (--checkpoint or `checkpoint` in the config file)")
}

fn run_status(args: &StatusArgs, config: &Config, color: bool) -> Result<ExitCode> {
    let path = checkpoint_path(args.checkpoint.as_ref(), config)?;
    let store = StateStore::new(Some(path.clone()));

    let document = match store.read_document() {
        Ok(doc) => doc,
        Err(CheckpointError::Read { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            bail!("No checkpoint file at {}", path.display())
        }
        Err(e) => return Err(e.into()),
    };

    let report = StatusReport::new(&path, &document.states());
    let mut stdout = std::io::stdout().lock();
    match args.output {
        OutputFormat::Json => output::json::write_to(&report, &mut stdout)?,
        OutputFormat::Text => {
            stdout.write_all(output::text::render_status(&report, color).as_bytes())?;
        }
    }
    Ok(ExitCode::Success)
}

fn run_forget(args: &ForgetArgs, config: &Config) -> Result<ExitCode> {
    let path = checkpoint_path(args.checkpoint.as_ref(), config)?;
    let store = StateStore::new(Some(path.clone()));
    let root = normalize_root(&args.path);

    if store
        .remove(&root)
        .with_context(|| format!("Failed to update {}", path.display()))?
    {
        println!("Removed checkpoint for {}", root);
    } else {
        println!("No checkpoint stored for {}", root);
    }
    Ok(ExitCode::Success)
}
