//! The state record threaded through every pipeline stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scanner::Fingerprint;

/// Fingerprint -> paths sharing it, in scan-discovery order.
pub type FingerprintIndex = BTreeMap<Fingerprint, Vec<String>>;

/// Paths sharing one fingerprint, reported only when two or more exist.
pub type DuplicateGroup = Vec<String>;

/// Named fields of [`PipelineState`] a stage can declare as required input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// `rootPath`
    RootPath,
    /// `fingerprintIndex`
    FingerprintIndex,
    /// `duplicateGroups`
    DuplicateGroups,
}

impl StateField {
    /// Field name as it appears in checkpoint documents.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RootPath => "rootPath",
            Self::FingerprintIndex => "fingerprintIndex",
            Self::DuplicateGroups => "duplicateGroups",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable state shared by the stages of one scan.
///
/// Serialized with camelCase keys, which is the shape stored under
/// `"state"` in a checkpoint document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// Index of the next stage to execute; 0 means idle.
    #[serde(default)]
    pub cursor: usize,
    /// Output of the index-building stage.
    #[serde(default)]
    pub fingerprint_index: Option<FingerprintIndex>,
    /// Output of the duplicate-detection stage.
    #[serde(default)]
    pub duplicate_groups: Option<Vec<DuplicateGroup>>,
    /// Description of the failure that halted the last run.
    #[serde(default)]
    pub last_error: Option<String>,
    /// Tree being scanned; also the checkpoint key.
    #[serde(default)]
    pub root_path: Option<String>,
}

impl PipelineState {
    /// Fresh state for scanning `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root_path: Some(root.into()),
            ..Self::default()
        }
    }

    /// Whether `field` holds a usable value.
    ///
    /// An empty root path counts as absent.
    #[must_use]
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::RootPath => self.root_path.as_deref().is_some_and(|p| !p.is_empty()),
            StateField::FingerprintIndex => self.fingerprint_index.is_some(),
            StateField::DuplicateGroups => self.duplicate_groups.is_some(),
        }
    }

    /// Checkpoint key, if the state has a root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.root_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether the last run halted with an error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.last_error.is_some()
    }

    /// Duplicate groups of a successful run; empty when failed or not computed.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        if self.is_failed() {
            return &[];
        }
        self.duplicate_groups.as_deref().unwrap_or(&[])
    }
}
