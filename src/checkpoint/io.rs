//! I/O operations for checkpoint documents.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::pipeline::{Checkpointer, PipelineState};

use super::{CheckpointDocument, CheckpointError, CheckpointResult};

/// Loads and saves per-root pipeline snapshots in one JSON document.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    path: Option<PathBuf>,
}

impl StateStore {
    /// Create a store writing to `path`, or an unconfigured store for `None`.
    #[must_use]
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// The configured destination.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a destination is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.path.is_some()
    }

    /// Read the document, reporting every problem.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::NoDestination`], [`CheckpointError::Read`] (including
    /// a missing file) or [`CheckpointError::Corrupt`].
    pub fn read_document(&self) -> CheckpointResult<CheckpointDocument> {
        let path = self.path.as_ref().ok_or(CheckpointError::NoDestination)?;

        let content = fs::read_to_string(path).map_err(|source| CheckpointError::Read {
            path: path.clone(),
            source,
        })?;

        CheckpointDocument::from_json(&content).map_err(|source| CheckpointError::Corrupt {
            path: path.clone(),
            source,
        })
    }

    /// Read the document, treating a missing or invalid file as empty.
    #[must_use]
    pub fn load_document(&self) -> CheckpointDocument {
        match self.read_document() {
            Ok(doc) => doc,
            Err(CheckpointError::NoDestination) => CheckpointDocument::new(),
            Err(CheckpointError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                CheckpointDocument::new()
            }
            Err(e) => {
                log::warn!("{}; treating it as empty", e);
                CheckpointDocument::new()
            }
        }
    }

    /// Load the snapshot stored for `key`.
    #[must_use]
    pub fn load(&self, key: &str) -> Option<PipelineState> {
        self.load_document().state(key)
    }

    /// Store `state` under `key`, preserving every other entry.
    ///
    /// The existing document is re-read with the same tolerant rules as
    /// [`StateStore::load`], the entry for `key` is replaced and the whole
    /// document is written back.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::NoDestination`] without writing anything when no
    /// path is configured, or [`CheckpointError::Write`] if the file cannot be
    /// written.
    pub fn save(&self, key: &str, state: &PipelineState) -> CheckpointResult<()> {
        let path = self.path.as_ref().ok_or(CheckpointError::NoDestination)?;

        let mut doc = self.load_document();
        doc.set_state(key, state)?;
        self.write_document(path, &doc)?;

        log::debug!(
            "Checkpoint saved for {} at {} (cursor {})",
            key,
            path.display(),
            state.cursor
        );
        log::trace!("Checkpoint state: {}", serde_json::to_string(state)?);
        Ok(())
    }

    /// Drop the entry for `key`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::save`].
    pub fn remove(&self, key: &str) -> CheckpointResult<bool> {
        let path = self.path.as_ref().ok_or(CheckpointError::NoDestination)?;

        let mut doc = self.load_document();
        if !doc.remove(key) {
            return Ok(false);
        }
        self.write_document(path, &doc)?;
        log::debug!("Checkpoint removed for {} from {}", key, path.display());
        Ok(true)
    }

    fn write_document(&self, path: &Path, doc: &CheckpointDocument) -> CheckpointResult<()> {
        let json = doc.to_json_pretty()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CheckpointError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, json).map_err(|source| CheckpointError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Checkpointer for StateStore {
    fn checkpoint(&self, state: &PipelineState) -> Result<(), CheckpointError> {
        let key = state.key().ok_or(CheckpointError::MissingKey)?;
        self.save(key, state)
    }
}
