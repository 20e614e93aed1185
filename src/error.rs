//! Process exit codes and structured error reporting.

use serde::Serialize;

use crate::pipeline::{ErrorKind, RunOutcome};

/// Exit codes for the stagedupe binary.
///
/// - 0: Scan completed and duplicates were found
/// - 1: General error, including a halted pipeline
/// - 2: Scan completed and found no duplicates
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: duplicates were found.
    Success = 0,
    /// General error.
    GeneralError = 1,
    /// No duplicates were found.
    NoDuplicates = 2,
    /// Interrupted by user.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SD000",
            Self::GeneralError => "SD001",
            Self::NoDuplicates => "SD002",
            Self::Interrupted => "SD130",
        }
    }

    /// Exit code for a finished pipeline run.
    #[must_use]
    pub fn for_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed { state, .. } if state.groups().is_empty() => Self::NoDuplicates,
            RunOutcome::Completed { .. } => Self::Success,
            RunOutcome::Failed { kind, .. } => Self::for_kind(*kind),
        }
    }

    /// Exit code for an application error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<PipelineFailure>() {
            Some(failure) => Self::for_kind(failure.kind),
            None => Self::GeneralError,
        }
    }

    fn for_kind(kind: ErrorKind) -> Self {
        if kind == ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// A pipeline run that halted, surfaced to the binary as an error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Scan of {root} halted at stage {stage}: {message}")]
pub struct PipelineFailure {
    /// Root being scanned
    pub root: String,
    /// 1-based stage number that failed
    pub stage: usize,
    /// Failure classification
    pub kind: ErrorKind,
    /// The state's `lastError`
    pub message: String,
}

impl PipelineFailure {
    /// Build from a failed outcome; `None` for a completed run.
    #[must_use]
    pub fn from_outcome(outcome: &RunOutcome) -> Option<Self> {
        match outcome {
            RunOutcome::Completed { .. } => None,
            RunOutcome::Failed {
                state,
                kind,
                message,
            } => Some(Self {
                root: state.key().unwrap_or_default().to_string(),
                stage: state.cursor + 1,
                kind: *kind,
                message: message.clone(),
            }),
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredError {
    /// Error code (e.g. "SD001")
    pub code: String,
    /// Exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Pipeline failure kind, when a scan halted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Describe `err`, which ends the process with `exit_code`.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            kind: err
                .downcast_ref::<PipelineFailure>()
                .map(|f| format!("{:?}", f.kind)),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
