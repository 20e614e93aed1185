//! Command-line interface definitions.
//!
//! ```bash
//! # Scan and checkpoint after every stage
//! stagedupe scan ~/Photos --checkpoint ~/.cache/photos.json
//!
//! # Pick up an interrupted scan where it stopped
//! stagedupe scan ~/Photos --checkpoint ~/.cache/photos.json --resume
//!
//! # Inspect or drop stored checkpoints
//! stagedupe status --checkpoint ~/.cache/photos.json
//! stagedupe forget ~/Photos --checkpoint ~/.cache/photos.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Resumable duplicate file finder.
///
/// Fingerprints every regular file under a directory with SHA-1 and reports
/// groups of identical files. Progress is checkpointed after each stage so an
/// interrupted scan can be resumed.
#[derive(Debug, Parser)]
#[command(name = "stagedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: config.toml in the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// List the roots stored in a checkpoint file
    Status(StatusArgs),
    /// Drop one root's checkpoint
    Forget(ForgetArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for `scan`.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Checkpoint file to write after every stage
    #[arg(long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,

    /// Resume from the checkpoint stored for PATH, if any
    #[arg(long)]
    pub resume: bool,

    /// Leave the checkpoint file out of the scan
    #[arg(long)]
    pub exclude_checkpoint: bool,

    /// Follow symbolic links (skipped by default)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Number of hashing threads (1 = sequential)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for `status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Checkpoint file to inspect
    #[arg(long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Arguments for `forget`.
#[derive(Debug, Args)]
pub struct ForgetArgs {
    /// Root whose checkpoint should be removed
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Checkpoint file to edit
    #[arg(long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
