//! Duplicate detection over a fingerprint index.
//!
//! # Overview
//!
//! Any fingerprint shared by two or more paths is a duplicate group. Groups
//! are normalized so the result is a pure function of the index: paths are
//! sorted within each group, then the groups themselves are sorted.
//!
//! # Example
//!
//! ```
//! use stagedupe::duplicates::detect_duplicates;
//! use stagedupe::pipeline::FingerprintIndex;
//!
//! let mut index = FingerprintIndex::new();
//! index.insert("h1".into(), vec!["b".into(), "a".into()]);
//! index.insert("h2".into(), vec!["c".into()]);
//!
//! let groups = detect_duplicates(&index);
//! assert_eq!(groups, vec![vec!["a".to_string(), "b".to_string()]]);
//! ```

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    DuplicateGroup, FingerprintIndex, PipelineState, Stage, StageError, StateField,
};

/// Reduce `index` to its sorted duplicate groups.
///
/// Single-path fingerprints contribute nothing; an empty index yields an
/// empty list.
#[must_use]
pub fn detect_duplicates(index: &FingerprintIndex) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = index
        .values()
        .filter(|paths| paths.len() > 1)
        .map(|paths| {
            let mut group = paths.clone();
            group.sort();
            group
        })
        .collect();
    groups.sort();
    groups
}

/// Summary counts for a set of duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    /// Number of duplicate groups
    pub groups: usize,
    /// Files that belong to some group
    pub duplicate_files: usize,
    /// Copies beyond the first in each group
    pub redundant_files: usize,
}

impl GroupStats {
    /// Count `groups`.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        let duplicate_files: usize = groups.iter().map(Vec::len).sum();
        Self {
            groups: groups.len(),
            duplicate_files,
            redundant_files: duplicate_files.saturating_sub(groups.len()),
        }
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.groups > 0
    }
}

/// Stage that derives `duplicateGroups` from `fingerprintIndex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectDuplicates;

impl Stage for DetectDuplicates {
    fn name(&self) -> &'static str {
        "detect_duplicates"
    }

    fn required_inputs(&self) -> &'static [StateField] {
        &[StateField::FingerprintIndex]
    }

    fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let index = state
            .fingerprint_index
            .as_ref()
            .ok_or(StageError::MissingInput(StateField::FingerprintIndex))?;

        let groups = detect_duplicates(index);
        let stats = GroupStats::from_groups(&groups);
        log::info!(
            "Found {} duplicate groups covering {} files",
            stats.groups,
            stats.duplicate_files
        );

        state.duplicate_groups = Some(groups);
        Ok(())
    }
}
