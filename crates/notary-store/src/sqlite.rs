//! SQLite implementation of the ContentStore trait.
//!
//! This is the primary storage backend for the Notary Kernel. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use notary_core::{AccountId, ContentId, DocumentSummary, StoredDocument};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentStore, InsertResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteContentStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {e}")))?
    }
}

/// Raw column values of a `documents` row.
struct DocumentRow {
    content_id: Vec<u8>,
    bytes: Vec<u8>,
    mime_type: String,
    file_name: String,
    owner: String,
    stored_at: i64,
}

impl DocumentRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            content_id: row.get("content_id")?,
            bytes: row.get("bytes")?,
            mime_type: row.get("mime_type")?,
            file_name: row.get("file_name")?,
            owner: row.get("owner")?,
            stored_at: row.get("stored_at")?,
        })
    }

    fn into_document(self) -> Result<StoredDocument> {
        let content_id = ContentId::try_from(self.content_id.as_slice())
            .map_err(|_| StoreError::InvalidData("content_id is not 32 bytes".into()))?;
        let owner = AccountId::new(self.owner)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        Ok(StoredDocument {
            content_id,
            bytes: Bytes::from(self.bytes),
            mime_type: self.mime_type,
            file_name: self.file_name,
            owner,
            stored_at: self.stored_at,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn insert_document(&self, document: &StoredDocument) -> Result<InsertResult> {
        let document = document.clone();

        self.blocking(move |conn| {
            // The primary key makes the existence check and the write one step.
            let changed = conn.execute(
                "INSERT INTO documents (
                    content_id, bytes, mime_type, file_name, owner, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(content_id) DO NOTHING",
                params![
                    document.content_id.0.as_slice(),
                    document.bytes.as_ref(),
                    document.mime_type,
                    document.file_name,
                    document.owner.as_str(),
                    document.stored_at,
                ],
            )?;

            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get(&self, id: &ContentId) -> Result<StoredDocument> {
        let id = *id;

        let row = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT content_id, bytes, mime_type, file_name, owner, stored_at
                     FROM documents WHERE content_id = ?1",
                    params![id.0.as_slice()],
                    DocumentRow::read,
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        row.ok_or(StoreError::NotFound(id))?.into_document()
    }

    async fn has(&self, id: &ContentId) -> Result<bool> {
        let id = *id;

        self.blocking(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE content_id = ?1",
                params![id.0.as_slice()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn list(&self, owner: &AccountId) -> Result<Vec<DocumentSummary>> {
        let owner = owner.clone();

        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT file_name, content_id, stored_at
                     FROM documents WHERE owner = ?1
                     ORDER BY stored_at ASC, content_id ASC",
                )?;
                let rows = stmt
                    .query_map(params![owner.as_str()], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        // BLOB comparison is memcmp, which matches ContentId's byte ordering.
        rows.into_iter()
            .map(|(file_name, id_bytes, stored_at)| {
                let content_id = ContentId::try_from(id_bytes.as_slice())
                    .map_err(|_| StoreError::InvalidData("content_id is not 32 bytes".into()))?;
                Ok(DocumentSummary {
                    file_name,
                    content_id,
                    stored_at,
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
