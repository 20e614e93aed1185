//! Stage dispatch with commit-on-success and per-transition checkpoints.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::checkpoint::CheckpointError;

use super::{Checkpointer, PipelineState, RunOutcome, Stage, StageError};

/// Runs an ordered list of stages against a [`PipelineState`].
///
/// # Example
///
/// ```no_run
/// use stagedupe::checkpoint::StateStore;
/// use stagedupe::duplicates::{BuildIndex, DetectDuplicates};
/// use stagedupe::pipeline::{PipelineRunner, PipelineState};
///
/// let store = StateStore::new(Some("scan.json".into()));
/// let runner = PipelineRunner::new(vec![
///     Box::new(BuildIndex::default()),
///     Box::new(DetectDuplicates),
/// ])
/// .with_checkpointer(&store);
///
/// let outcome = runner.run(PipelineState::new("/data"));
/// println!("{:?}", outcome.state().groups());
/// ```
pub struct PipelineRunner<'a> {
    stages: Vec<Box<dyn Stage + 'a>>,
    checkpointer: Option<&'a dyn Checkpointer>,
}

impl<'a> PipelineRunner<'a> {
    /// Create a runner over `stages` with no checkpointing.
    #[must_use]
    pub fn new(stages: Vec<Box<dyn Stage + 'a>>) -> Self {
        Self {
            stages,
            checkpointer: None,
        }
    }

    /// Checkpoint through `checkpointer` after every transition.
    #[must_use]
    pub fn with_checkpointer(mut self, checkpointer: &'a dyn Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the stage list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Execute `stages[state.cursor..]` in order.
    ///
    /// Each stage runs on a clone of the state. On success the clone is
    /// committed, the cursor advances and a checkpoint is written before the
    /// next stage starts. After the last stage the cursor resets to 0 and a
    /// final checkpoint is written.
    ///
    /// A state whose cursor already equals the stage count was snapshotted
    /// after the last stage but before the reset. Its final stage is run
    /// again so that stage's outputs are rebuilt from its inputs instead of
    /// being trusted from storage.
    ///
    /// On failure the run halts and the state as it stood before the failing
    /// stage is returned with `lastError` set. Failed states are not
    /// checkpointed, so the last stored checkpoint remains the resume point.
    #[must_use]
    pub fn run(&self, mut state: PipelineState) -> RunOutcome {
        let total = self.stages.len();

        if state.cursor > total {
            let err = StageError::InvalidCursor {
                cursor: state.cursor,
                stages: total,
            };
            return halt(state, &err);
        }

        if total > 0 && state.cursor == total {
            log::info!("Final stage was never confirmed; running it again");
            state.cursor = total - 1;
        }

        if state.cursor > 0 {
            log::info!("Resuming pipeline at stage {} of {}", state.cursor + 1, total);
        }

        while state.cursor < total {
            let index = state.cursor;
            let stage = &self.stages[index];

            if let Some(missing) = stage
                .required_inputs()
                .iter()
                .find(|field| !state.has(**field))
            {
                log::debug!("Stage '{}' is missing input '{}'", stage.name(), missing);
                return halt(state, &StageError::MissingInput(*missing));
            }

            log::info!("Stage {}/{}: {}", index + 1, total, stage.name());

            let mut working = state.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| stage.execute(&mut working)))
                .unwrap_or_else(|payload| {
                    Err(StageError::Panicked {
                        stage: stage.name(),
                        message: panic_message(payload.as_ref()),
                    })
                });

            if let Err(err) = result {
                return halt(state, &err);
            }

            working.cursor = index + 1;
            if let Err(err) = self.checkpoint(&working) {
                return halt(state, &err);
            }

            log::debug!("Stage '{}' committed", stage.name());
            state = working;
        }

        state.cursor = 0;
        let checkpointed = match self.checkpoint(&state) {
            Ok(written) => written,
            Err(err) => return halt(state, &err),
        };

        RunOutcome::Completed {
            state,
            checkpointed,
        }
    }

    /// Returns whether a snapshot was actually written.
    fn checkpoint(&self, state: &PipelineState) -> Result<bool, StageError> {
        let Some(checkpointer) = self.checkpointer else {
            return Ok(false);
        };

        match checkpointer.checkpoint(state) {
            Ok(()) => Ok(true),
            Err(e @ (CheckpointError::NoDestination | CheckpointError::MissingKey)) => {
                log::debug!("Checkpoint skipped: {}", e);
                Ok(false)
            }
            Err(e) => Err(StageError::Checkpoint(e)),
        }
    }
}

fn halt(mut state: PipelineState, err: &StageError) -> RunOutcome {
    let message = err.to_string();
    log::error!("Pipeline halted: {}", message);
    state.last_error = Some(message.clone());
    RunOutcome::Failed {
        state,
        kind: err.kind(),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
