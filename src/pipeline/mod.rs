//! Resumable staged pipeline.
//!
//! # Overview
//!
//! A pipeline is an ordered list of [`Stage`]s run against one
//! [`PipelineState`]. The [`PipelineRunner`] validates each stage's declared
//! inputs, runs it on an isolated copy of the state, commits the copy only on
//! success, advances the cursor and writes a checkpoint before moving on.
//! A run can start from any cursor, which is how an interrupted scan resumes.
//!
//! # Architecture
//!
//! * [`state`]: The typed state record and its named fields.
//! * [`runner`]: Stage dispatch, commit-on-success and checkpointing.
//!
//! Failures never unwind past the runner: they come back as
//! [`RunOutcome::Failed`] with `lastError` set on the returned state.

pub mod runner;
pub mod state;

use crate::checkpoint::CheckpointError;
use crate::scanner::{HashError, ScanError};

pub use runner::PipelineRunner;
pub use state::{DuplicateGroup, FingerprintIndex, PipelineState, StateField};

/// One unit of pipeline work.
///
/// Implementations read their inputs from the state and write their outputs
/// back into it. The runner hands each stage a private copy, so a stage that
/// fails half-way leaves nothing behind.
pub trait Stage {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fields that must be present before the stage may run.
    fn required_inputs(&self) -> &'static [StateField] {
        &[]
    }

    /// Run the stage, mutating `state` in place.
    ///
    /// # Errors
    ///
    /// Any [`StageError`]; the runner discards `state` when one is returned.
    fn execute(&self, state: &mut PipelineState) -> Result<(), StageError>;
}

/// Destination for the state snapshots taken after every stage transition.
pub trait Checkpointer {
    /// Persist `state`.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::NoDestination`] and [`CheckpointError::MissingKey`]
    /// mean "nowhere to write" and are tolerated by the runner; anything else
    /// halts the run.
    fn checkpoint(&self, state: &PipelineState) -> Result<(), CheckpointError>;
}

/// Broad classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A stage's required field was absent.
    MissingInput,
    /// A file, directory or checkpoint could not be read or written.
    Io,
    /// A checkpoint document could not be parsed.
    CorruptCheckpoint,
    /// The run was cancelled.
    Interrupted,
    /// The state's cursor does not fit the stage list.
    InvalidCursor,
    /// A stage failed in an unexpected way (e.g. panicked).
    Internal,
}

/// Errors raised while running a stage.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// A declared input is missing from the state.
    #[error("Missing required input: {0}")]
    MissingInput(StateField),

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The directory walk failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The post-stage checkpoint could not be written.
    #[error("Checkpoint write failed: {0}")]
    Checkpoint(#[source] CheckpointError),

    /// The cursor points past the end of the stage list.
    #[error("Invalid cursor {cursor} for a pipeline of {stages} stage(s)")]
    InvalidCursor {
        /// Cursor found in the state
        cursor: usize,
        /// Number of stages in the pipeline
        stages: usize,
    },

    /// The stage body panicked.
    #[error("Stage '{stage}' panicked: {message}")]
    Panicked {
        /// Name of the stage
        stage: &'static str,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl StageError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput(_) => ErrorKind::MissingInput,
            Self::Checkpoint(CheckpointError::Corrupt { .. }) => ErrorKind::CorruptCheckpoint,
            Self::Hash(_) | Self::Checkpoint(_) => ErrorKind::Io,
            Self::Scan(ScanError::Interrupted) => ErrorKind::Interrupted,
            Self::Scan(_) => ErrorKind::Io,
            Self::InvalidCursor { .. } => ErrorKind::InvalidCursor,
            Self::Panicked { .. } => ErrorKind::Internal,
        }
    }
}

/// Result of [`PipelineRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage ran; the cursor has been reset to 0.
    Completed {
        /// Final state
        state: PipelineState,
        /// Whether the final snapshot reached a checkpoint destination
        checkpointed: bool,
    },
    /// The run halted. `state` is the last committed state with `lastError` set.
    Failed {
        /// State as of the last successful transition
        state: PipelineState,
        /// Failure classification
        kind: ErrorKind,
        /// Human-readable description (same text as `lastError`)
        message: String,
    },
}

impl RunOutcome {
    /// Borrow the final state.
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        match self {
            Self::Completed { state, .. } | Self::Failed { state, .. } => state,
        }
    }

    /// Take the final state.
    #[must_use]
    pub fn into_state(self) -> PipelineState {
        match self {
            Self::Completed { state, .. } | Self::Failed { state, .. } => state,
        }
    }

    /// Whether every stage ran.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Failure classification, if the run halted.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Whether the completed run's final state was written to a checkpoint.
    ///
    /// Always `false` for a failed run.
    #[must_use]
    pub fn checkpointed(&self) -> bool {
        matches!(
            self,
            Self::Completed {
                checkpointed: true,
                ..
            }
        )
    }
}
