//! # Storage Layer
//!
//! The organizer persists exactly one value: the [`Document`]. The
//! [`DocumentStore`] trait abstracts where that value lives so the
//! business logic never touches the filesystem directly.
//!
//! ## Persistence Granularity
//!
//! Every mutation made through the API ends with a full [`DocumentStore::save`].
//! There is no batching and no partial commit: the durable copy is either the
//! previous document or the new one, as long as the backend's single write is
//! atomic. `FileStore` writes to a temporary file and renames it into place.
//!
//! ## Boot Recovery
//!
//! [`load_or_default`] never fails. A missing document starts a fresh one; a
//! corrupt one is logged and replaced in memory by a fresh default (the
//! corrupt file is left on disk until the next successful save).
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: `data.json` in the data directory.
//! - [`memory::InMemoryStore`]: for tests, with write-failure simulation.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── data.json       # The document
//! ├── config.json     # SupporgConfig
//! ├── weather.json    # Last weather snapshot
//! └── cache/          # Resource cache generations
//! ```

use crate::error::Result;
use crate::model::Document;
use std::path::PathBuf;
use tracing::{debug, warn};

pub mod fs;
pub mod memory;

/// Abstract interface for document persistence.
pub trait DocumentStore {
    /// Load the stored document. `Ok(None)` when nothing was saved yet.
    fn load(&self) -> Result<Option<Document>>;

    /// Replace the stored document.
    fn save(&mut self, doc: &Document) -> Result<()>;

    /// Where the document lives (a real path or a virtual one).
    fn location(&self) -> PathBuf;
}

/// Loads the stored document, falling back to a fresh one with
/// `default_slots` when it is missing or unreadable.
pub fn load_or_default<S, N>(store: &S, default_slots: &[N]) -> Document
where
    S: DocumentStore,
    N: AsRef<str>,
{
    let mut doc = match store.load() {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            debug!(location = %store.location().display(), "no stored document, starting fresh");
            Document::with_slots(default_slots)
        }
        Err(err) => {
            warn!(
                location = %store.location().display(),
                error = %err,
                "stored document is unreadable, starting from an empty one"
            );
            Document::with_slots(default_slots)
        }
    };
    doc.normalize(default_slots);
    doc
}
