//! Logging setup for stagedupe.
//!
//! Log records go through the `log` facade to an `env_logger` backend on
//! stderr, so report output on stdout stays machine-readable. The level is
//! chosen by, in priority order:
//!
//! 1. `RUST_LOG` (if set)
//! 2. `--quiet` (errors only) or `--verbose` (`-v` debug, `-vv` trace)
//! 3. Default: info
//!
//! Without `RUST_LOG`, the chosen level applies to this crate only;
//! dependencies are capped at warn.
//!
//! # Example
//!
//! ```rust,no_run
//! use stagedupe::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Initialize logging from CLI verbosity flags.
///
/// Returns `false` if a logger was already installed (e.g. by a test
/// harness); the existing logger is left in place.
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let from_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    if from_env {
        builder.parse_default_env();
    } else {
        builder
            .filter_level(LevelFilter::Warn.min(level))
            .filter_module(env!("CARGO_CRATE_NAME"), level);
    }

    configure_format(&mut builder, verbose);

    let installed = builder.try_init().is_ok();
    if installed {
        if from_env {
            log::debug!("Logging configured from RUST_LOG");
        } else {
            log::debug!("Logging initialized at level {}", current_level_name());
        }
    }
    installed
}

/// Map CLI flags to a level filter. Quiet wins over verbose.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Debug builds get timestamps and, when verbose, module paths. Release
/// builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            let timestamp = buf.timestamp_seconds();
            if verbose > 0 {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} [{}] {}",
                    timestamp,
                    record.level(),
                    record.module_path().unwrap_or("?"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} {}",
                    timestamp,
                    record.level(),
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
        });
    }
}

/// Name of the current maximum log level.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
