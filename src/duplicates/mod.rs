//! Duplicate detection stages.
//!
//! This module provides the two stages of a scan:
//! - [`BuildIndex`]: fingerprint every regular file under the root
//! - [`DetectDuplicates`]: reduce the index to sorted duplicate groups
//!
//! [`default_stages`] builds the standard pipeline from them.

pub mod groups;
pub mod index;

pub use groups::{detect_duplicates, DetectDuplicates, GroupStats};
pub use index::{BuildIndex, IndexStats};

use crate::pipeline::Stage;

/// The standard scan pipeline: `[build_index, detect_duplicates]`.
#[must_use]
pub fn default_stages<'a>(build: BuildIndex) -> Vec<Box<dyn Stage + 'a>> {
    vec![Box::new(build), Box::new(DetectDuplicates)]
}
