//! ContentStore trait: the abstract interface for document persistence.
//!
//! This trait allows the kernel to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use notary_core::{AccountId, ContentId, DocumentSummary, StoredDocument};

use crate::error::Result;

/// Result of inserting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Document was inserted successfully.
    Inserted,
    /// A document with the same content already exists (idempotent - not an error).
    AlreadyExists,
}

/// The ContentStore trait: async interface for document persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Content addressing**: documents are keyed by the SHA-256 of their bytes.
/// - **Idempotent inserts**: a second insert of the same content returns
///   `AlreadyExists` and leaves the first document untouched, whatever its
///   file name or owner.
/// - **No deletes**: retention is not this store's concern.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert a fully-formed document.
    ///
    /// Concurrent inserts of the same identifier are serialised: exactly one
    /// returns `Inserted`, the rest observe `AlreadyExists`.
    async fn insert_document(&self, document: &StoredDocument) -> Result<InsertResult>;

    /// Fetch a document. Fails with `NotFound` if it was never stored.
    async fn get(&self, id: &ContentId) -> Result<StoredDocument>;

    /// Check if a document exists.
    async fn has(&self, id: &ContentId) -> Result<bool>;

    /// Documents first uploaded by `owner`, ordered by `stored_at` then id.
    async fn list(&self, owner: &AccountId) -> Result<Vec<DocumentSummary>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;
}

/// Extension trait for common store patterns.
pub trait ContentStoreExt: ContentStore {
    /// Hash and store document bytes, returning their content identifier.
    ///
    /// If the content is already present the existing entry is kept as is.
    fn put(
        &self,
        bytes: Bytes,
        mime_type: &str,
        file_name: &str,
        owner: &AccountId,
    ) -> impl std::future::Future<Output = Result<ContentId>> + Send;
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {
    async fn put(
        &self,
        bytes: Bytes,
        mime_type: &str,
        file_name: &str,
        owner: &AccountId,
    ) -> Result<ContentId> {
        let document =
            StoredDocument::new(bytes, mime_type, file_name, owner.clone(), now_millis());
        let id = document.content_id;

        match self.insert_document(&document).await? {
            InsertResult::Inserted => {
                tracing::debug!(content_id = %id, size = document.len(), "stored new document");
            }
            InsertResult::AlreadyExists => {
                tracing::debug!(content_id = %id, "document already stored, keeping first upload");
            }
        }

        Ok(id)
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
