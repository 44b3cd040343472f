//! # Notary
//!
//! The unified API for the document notary: content-addressed storage,
//! notarization records on an append-only ledger, and verification of
//! candidate files against those records.
//!
//! ## Overview
//!
//! - **Documents**: stored once per distinct content, keyed by SHA-256
//! - **Records**: immutable ledger facts binding sender, recipient, and content
//! - **Inbox**: records indexed per recipient, most recent first
//! - **Verification**: recompute a candidate's identifier and compare
//!
//! ## Key Concepts
//!
//! - **Content identifier**: `0x` + 64 lowercase hex digits; parsing accepts
//!   any case and either prefix convention
//! - **Record id**: the ledger's sequence number, the only ordering key
//! - **Mismatch**: a successful verification with `matched == false`, never an error
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use notary::{Notary, NotaryConfig, Submission};
//! use notary::core::{AccountId, Address};
//! use notary::ledger::MemoryLedger;
//! use notary::store::SqliteContentStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteContentStore::open("documents.db")?);
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let notary = Notary::new(store, ledger, NotaryConfig::default());
//!     notary.start().await?;
//!
//!     let owner = AccountId::new("alice@example.com")?;
//!     let sender: Address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse()?;
//!     let recipient: Address = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".parse()?;
//!
//!     let submitted = notary
//!         .submit(&owner, Submission::new(&b"hello"[..], sender, recipient))
//!         .await?;
//!     notary.wait_for_record(submitted.record_id, Duration::from_secs(5)).await?;
//!
//!     let result = notary.verify(submitted.record_id, b"hello")?;
//!     assert!(result.matched);
//!
//!     notary.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `notary::core` - Identifiers, records, documents, the hasher
//! - `notary::store` - Content store trait, SQLite and in-memory backends
//! - `notary::ledger` - Ledger trait, indexer, in-memory ledger

pub mod config;
pub mod error;
pub mod notary;
pub mod verify;

// Re-export component crates
pub use notary_core as core;
pub use notary_ledger as ledger;
pub use notary_store as store;

// Re-export main types for convenience
pub use config::{NotaryConfig, DEFAULT_MAX_DOCUMENT_BYTES};
pub use error::{NotaryError, Result, VerifyError};
pub use notary::{Notary, Submission, Submitted};
pub use verify::{RecordSource, VerificationResult, Verifier};

// Re-export commonly used core types
pub use notary_core::{
    hash, AccountId, Address, ContentId, DocumentSummary, NotarizationRecord, RecordId,
    StoredDocument,
};
