use super::DocumentStore;
use crate::error::{Result, SupporgError};
use crate::model::Document;
use std::path::PathBuf;

/// In-memory document store for testing.
///
/// Keeps the serialized JSON rather than the value itself so every
/// save/load goes through the same serde path as the file store.
#[derive(Default)]
pub struct InMemoryStore {
    raw: Option<String>,
    saves: usize,
    simulate_write_error: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose current content is the given raw text.
    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Some(raw.to_string()),
            ..Self::default()
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self) -> Result<Option<Document>> {
        match &self.raw {
            None => Ok(None),
            Some(raw) => {
                let doc = serde_json::from_str(raw).map_err(SupporgError::Serialization)?;
                Ok(Some(doc))
            }
        }
    }

    fn save(&mut self, doc: &Document) -> Result<()> {
        if self.simulate_write_error {
            return Err(SupporgError::Store("Simulated write error".to_string()));
        }
        self.raw = Some(serde_json::to_string(doc).map_err(SupporgError::Serialization)?);
        self.saves += 1;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("memory://data.json")
    }
}
