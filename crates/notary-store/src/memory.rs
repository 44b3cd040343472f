//! In-memory implementation of the ContentStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use notary_core::{sort_summaries, AccountId, ContentId, DocumentSummary, StoredDocument};

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, InsertResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
/// Hashing happens before the lock is taken, so the write lock only covers
/// the check-and-insert.
pub struct MemoryContentStore {
    documents: RwLock<HashMap<ContentId, StoredDocument>>,
}

impl MemoryContentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ContentId, StoredDocument>>> {
        self.documents
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ContentId, StoredDocument>>> {
        self.documents
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert_document(&self, document: &StoredDocument) -> Result<InsertResult> {
        let mut documents = self.write()?;

        if documents.contains_key(&document.content_id) {
            return Ok(InsertResult::AlreadyExists);
        }

        documents.insert(document.content_id, document.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get(&self, id: &ContentId) -> Result<StoredDocument> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn has(&self, id: &ContentId) -> Result<bool> {
        Ok(self.read()?.contains_key(id))
    }

    async fn list(&self, owner: &AccountId) -> Result<Vec<DocumentSummary>> {
        let mut summaries: Vec<DocumentSummary> = self
            .read()?
            .values()
            .filter(|doc| &doc.owner == owner)
            .map(StoredDocument::summary)
            .collect();

        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
