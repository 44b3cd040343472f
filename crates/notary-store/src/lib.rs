//! # Notary Store
//!
//! Content-addressed document storage for the Notary Kernel. Provides a
//! trait-based interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Documents are keyed by the SHA-256 of their bytes. The [`ContentStore`]
//! trait keeps the kernel storage-agnostic; [`SqliteContentStore`] is the
//! persistent backend and [`MemoryContentStore`] serves tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use notary_core::AccountId;
//! use notary_store::{ContentStore, ContentStoreExt, SqliteContentStore};
//!
//! async fn example() -> notary_store::Result<()> {
//!     let store = SqliteContentStore::open("documents.db")?;
//!     let owner = AccountId::new("alice@example.com").expect("non-empty");
//!
//!     let id = store
//!         .put(Bytes::from_static(b"hello"), "text/plain", "hello.txt", &owner)
//!         .await?;
//!     let doc = store.get(&id).await?;
//!     assert_eq!(doc.bytes.as_ref(), b"hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: storing the same bytes twice returns `AlreadyExists`
//!   and keeps the first upload's metadata
//! - **Distinct absence**: a missing document is [`StoreError::NotFound`], never
//!   confused with [`StoreError::Unavailable`]

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryContentStore;
pub use sqlite::SqliteContentStore;
pub use traits::{ContentStore, ContentStoreExt, InsertResult};
