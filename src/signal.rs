//! Ctrl+C handling.
//!
//! Interrupting a scan behaves like a crash: the stage in progress is
//! abandoned and the last checkpoint remains the resume point. The handler
//! only raises a shared flag; [`BuildIndex`](crate::duplicates::BuildIndex)
//! polls it between files and fails with `Interrupted`.
//!
//! ```rust,no_run
//! use stagedupe::duplicates::BuildIndex;
//! use stagedupe::signal::install_handler;
//!
//! let handler = install_handler().expect("signal handler");
//! let stage = BuildIndex::default().with_shutdown_flag(handler.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (128 + 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// A handler with no shutdown requested and no signal hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag itself, for handing to workers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error installing the Ctrl+C hook.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// ctrlc refused the handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook, or reuse the one already installed.
///
/// The returned handler's flag is lowered on every call, so repeated
/// in-process runs (tests) each start clean.
///
/// # Errors
///
/// [`SignalError::InstallFailed`] if ctrlc rejects the hook for a reason
/// other than one already being registered.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Progress up to the last stage is checkpointed.");
        let _ = stderr.flush();
    });

    match installed {
        Ok(()) => {}
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler registered elsewhere; shutdown flag is manual only");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
