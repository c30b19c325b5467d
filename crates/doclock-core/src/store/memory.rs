use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        RwLock,
    },
};

use super::{DocumentStore, StoreError};
use crate::document::DocumentId;

/// In-memory document store.
///
/// Counts reads and writes so callers can check the one-read, at-most-one-
/// write contract of the coordinator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<DocumentId, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(id, content)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if an id does not parse.
    pub fn with_documents<'a>(
        docs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, StoreError> {
        let map = docs
            .into_iter()
            .map(|(id, content)| {
                DocumentId::parse(id)
                    .map(|id| (id, content.to_string()))
                    .map_err(|e| StoreError::InvalidPath(e.to_string()))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            docs: RwLock::new(map),
            ..Self::default()
        })
    }

    /// Insert or replace a document without touching the counters.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if a previous writer panicked.
    pub fn insert(&self, id: DocumentId, content: impl Into<String>) -> Result<(), StoreError> {
        self.docs
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .insert(id, content.into());
        Ok(())
    }

    /// Current content of a document without touching the counters.
    #[must_use]
    pub fn snapshot(&self, id: &DocumentId) -> Option<String> {
        self.docs.read().ok().and_then(|docs| docs.get(id).cloned())
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, id: &DocumentId) -> Result<String, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.docs
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn write(&self, id: &DocumentId, content: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.docs
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .insert(id.clone(), content.to_string());
        Ok(())
    }

    fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self
            .docs
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .keys()
            .cloned()
            .collect())
    }
}
