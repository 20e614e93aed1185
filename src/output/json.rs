//! JSON output.
//!
//! # Scan schema
//!
//! ```json
//! {
//!   "root": "/data",
//!   "status": "completed",
//!   "groups": [["/data/a", "/data/b"]],
//!   "stats": {"groups": 1, "duplicateFiles": 2, "redundantFiles": 1},
//!   "indexedFiles": 3,
//!   "generatedAt": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! A failed scan has `"status": "failed"`, a `lastError` and no groups.

use std::io::Write;

use serde::Serialize;

/// Errors writing JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// Serialization failed
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing failed
    #[error("I/O error writing JSON: {0}")]
    Io(#[from] std::io::Error),
}

/// Pretty-print `report` to a string.
///
/// # Errors
///
/// Only fails if serialization itself fails.
pub fn to_json_pretty<T: Serialize>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Write `report` to `writer` followed by a newline.
///
/// # Errors
///
/// Fails if serialization or the write fails.
pub fn write_to<T: Serialize, W: Write>(report: &T, writer: &mut W) -> Result<(), JsonOutputError> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writer.write_all(b"\n")?;
    Ok(())
}
