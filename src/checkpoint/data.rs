//! In-memory form of a checkpoint document.

use serde_json::{Map, Value};

use crate::pipeline::PipelineState;

/// Key under which each root's snapshot is nested.
const STATE_KEY: &str = "state";

/// A checkpoint document: root path -> `{ "state": PipelineState }`.
///
/// The document is kept as raw JSON so that entries this process does not
/// touch (other roots, or keys written by other tools) survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointDocument {
    entries: Map<String, Value>,
}

impl CheckpointDocument {
    /// An empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Fails if `json` is not a JSON object.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let entries: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    /// Render the full document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry exists for `key`, decodable or not.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All top-level keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Decode the state stored for `key`.
    ///
    /// Returns `None` when the key is absent or its entry does not hold a
    /// decodable state.
    #[must_use]
    pub fn state(&self, key: &str) -> Option<PipelineState> {
        let raw = self.entries.get(key)?.get(STATE_KEY)?;
        match serde_json::from_value(raw.clone()) {
            Ok(state) => Some(state),
            Err(e) => {
                log::warn!("Ignoring undecodable checkpoint entry for {}: {}", key, e);
                None
            }
        }
    }

    /// Every decodable `(root, state)` pair, in key order.
    #[must_use]
    pub fn states(&self) -> Vec<(String, PipelineState)> {
        self.entries
            .keys()
            .filter_map(|key| self.state(key).map(|state| (key.clone(), state)))
            .collect()
    }

    /// Replace the entry for `key` with `state`, leaving every other entry as is.
    ///
    /// # Errors
    ///
    /// Only fails if `state` cannot be converted to JSON.
    pub fn set_state(&mut self, key: &str, state: &PipelineState) -> serde_json::Result<()> {
        let mut entry = Map::new();
        entry.insert(STATE_KEY.to_string(), serde_json::to_value(state)?);
        self.entries.insert(key.to_string(), Value::Object(entry));
        Ok(())
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}
