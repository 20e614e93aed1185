//! Report formatting for scan results and checkpoint status.
//!
//! Reports are built once from pipeline state and rendered by a formatter:
//! - [`text`]: human-readable, optionally colored
//! - [`json`]: machine-readable
//!
//! A scan that halted carries its `lastError` and never lists groups.

pub mod json;
pub mod text;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::GroupStats;
use crate::pipeline::{DuplicateGroup, PipelineState, RunOutcome};

/// Whether the scan ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every stage ran.
    Completed,
    /// A stage failed; see `lastError`.
    Failed,
}

/// Result of one `scan` invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Scanned root
    pub root: String,
    /// Completion status
    pub status: ScanStatus,
    /// Sorted duplicate groups; empty when failed
    pub groups: Vec<DuplicateGroup>,
    /// Counts over `groups`
    pub stats: GroupStats,
    /// Files fingerprinted, when the index was built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_files: Option<usize>,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Checkpoint destination, when one was configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    /// Whether the final state was written to `checkpoint`
    pub checkpoint_saved: bool,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl ScanReport {
    /// Build a report from a finished run that checkpointed to `checkpoint`.
    #[must_use]
    pub fn from_outcome(outcome: &RunOutcome, checkpoint: Option<&Path>) -> Self {
        let state = outcome.state();
        let status = if outcome.is_completed() {
            ScanStatus::Completed
        } else {
            ScanStatus::Failed
        };
        let groups = match status {
            ScanStatus::Completed => state.groups().to_vec(),
            ScanStatus::Failed => Vec::new(),
        };

        Self {
            root: state.key().unwrap_or_default().to_string(),
            status,
            stats: GroupStats::from_groups(&groups),
            groups,
            indexed_files: indexed_files(state),
            last_error: state.last_error.clone(),
            checkpoint: checkpoint.map(|p| p.display().to_string()),
            checkpoint_saved: outcome.checkpointed(),
            generated_at: Utc::now(),
        }
    }

    /// Whether any duplicates were reported.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.stats.has_duplicates()
    }
}

/// One root's entry in a checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    /// Root path (checkpoint key)
    pub root: String,
    /// Index of the next stage; 0 when idle or complete
    pub cursor: usize,
    /// Files in the stored index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_files: Option<usize>,
    /// Stored duplicate group count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_groups: Option<usize>,
    /// Error recorded by the last run, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl StatusEntry {
    /// Summarize one stored state.
    #[must_use]
    pub fn new(root: &str, state: &PipelineState) -> Self {
        Self {
            root: root.to_string(),
            cursor: state.cursor,
            indexed_files: indexed_files(state),
            duplicate_groups: state.duplicate_groups.as_ref().map(Vec::len),
            last_error: state.last_error.clone(),
        }
    }
}

/// Contents of a checkpoint file, for `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Checkpoint file
    pub checkpoint: String,
    /// One entry per stored root, in key order
    pub entries: Vec<StatusEntry>,
}

impl StatusReport {
    /// Build from `(root, state)` pairs.
    #[must_use]
    pub fn new(checkpoint: &Path, entries: &[(String, PipelineState)]) -> Self {
        Self {
            checkpoint: checkpoint.display().to_string(),
            entries: entries
                .iter()
                .map(|(root, state)| StatusEntry::new(root, state))
                .collect(),
        }
    }
}

fn indexed_files(state: &PipelineState) -> Option<usize> {
    state
        .fingerprint_index
        .as_ref()
        .map(|index| index.values().map(Vec::len).sum())
}
