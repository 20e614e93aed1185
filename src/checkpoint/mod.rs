//! Checkpoint module for persisting and resuming pipeline state.
//!
//! This module stores one [`PipelineState`](crate::pipeline::PipelineState)
//! snapshot per scanned root in a single JSON document, so a long scan that is
//! interrupted can pick up at the last completed stage.
//!
//! # Features
//!
//! * **Keyed**: Each root path owns one entry; saving one root never touches
//!   another root's entry.
//! * **Tolerant loading**: A missing or unparseable document reads as empty.
//! * **Portability**: Documents are human-readable, pretty-printed JSON.
//!
//! # Concurrency
//!
//! Saves are a full read-modify-write of the document with no locking. Two
//! processes saving to the same file at once can lose one writer's update
//! (last write wins).
//!
//! # Architecture
//!
//! * [`data`]: The document model.
//! * [`io`]: [`StateStore`], which loads, merges and writes documents.

pub mod data;
pub mod io;

use std::path::PathBuf;

pub use data::CheckpointDocument;
pub use io::StateStore;

/// Errors raised by checkpoint storage.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// No checkpoint destination was configured.
    #[error("No checkpoint destination configured")]
    NoDestination,

    /// The state has no root path to key the checkpoint by.
    #[error("State has no root path to key the checkpoint by")]
    MissingKey,

    /// The checkpoint file could not be read.
    #[error("Failed to read checkpoint {path}: {source}")]
    Read {
        /// Checkpoint file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint file is not a valid document.
    #[error("Corrupt checkpoint {path}: {source}")]
    Corrupt {
        /// Checkpoint file
        path: PathBuf,
        /// The parse error
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint file could not be written.
    #[error("Failed to write checkpoint {path}: {source}")]
    Write {
        /// Checkpoint file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The state could not be serialized.
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result alias for checkpoint operations.
pub type CheckpointResult<T> = Result<T, CheckpointError>;
