//! Document store seam
//!
//! The engine only needs three things from the substrate that holds and
//! propagates documents: read one, write one, list them all. Propagation
//! between agents (pull before, push after) is the substrate's concern.
//!
//! - [`FsStore`] - documents as files under a root directory
//! - [`MemoryStore`] - in-memory map with read/write counters

mod fs;
mod memory;

pub use fs::{FsStore, STATE_DIR};
pub use memory::MemoryStore;
use thiserror::Error;

use crate::document::DocumentId;

/// Failure of the underlying storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document path: {0}")]
    InvalidPath(String),

    #[error("store state poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Persistent home of managed documents
pub trait DocumentStore {
    /// Read the full content of a document.
    fn read(&self, id: &DocumentId) -> Result<String, StoreError>;

    /// Replace the full content of a document.
    fn write(&self, id: &DocumentId, content: &str) -> Result<(), StoreError>;

    /// Every managed document, sorted.
    fn list(&self) -> Result<Vec<DocumentId>, StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn read(&self, id: &DocumentId) -> Result<String, StoreError> {
        (**self).read(id)
    }

    fn write(&self, id: &DocumentId, content: &str) -> Result<(), StoreError> {
        (**self).write(id, content)
    }

    fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        (**self).list()
    }
}
