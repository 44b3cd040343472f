//! # Notary Core
//!
//! Pure primitives for the Notary Kernel: content identifiers, ledger records,
//! and stored-document metadata.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the values every other crate exchanges.
//!
//! ## Key Types
//!
//! - [`ContentId`] - SHA-256 fingerprint of a document (see [`hash`])
//! - [`RecordId`] - Ledger-assigned sequence number, the only ordering key
//! - [`NotarizationRecord`] - Immutable ledger fact binding sender, recipient, and content
//! - [`StoredDocument`] - Document bytes plus upload metadata
//!
//! ## Encoding
//!
//! Identifiers cross component boundaries as `0x` + lowercase hex. Parsing
//! accepts either prefix convention and any letter case. See [`encoding`].

pub mod document;
pub mod encoding;
pub mod error;
pub mod hasher;
pub mod record;
pub mod types;

pub use document::{sort_summaries, DocumentSummary, StoredDocument};
pub use error::{CoreError, Result};
pub use hasher::{hash, hash_reader, ContentHasher, ContentId, HASH_ALGORITHM};
pub use record::{NewRecord, NotarizationRecord};
pub use types::{AccountId, Address, RecordId, TxRef};
