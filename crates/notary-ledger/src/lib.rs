//! # Notary Ledger
//!
//! Reads the append-only notarization ledger and keeps queryable indexes
//! over it.
//!
//! ## Overview
//!
//! The ledger is an external, totally ordered record source reached through
//! the [`Ledger`] trait. The [`Indexer`] replays it at startup, follows its
//! live subscription, and serves by-id and by-recipient lookups from a
//! [`RecordIndex`] that always holds a prefix of the ledger.
//!
//! ## Key Properties
//!
//! - **Id-ordered**: record ids are the only ordering and dedup key
//! - **Idempotent**: redelivered records are discarded by the fold
//! - **Gap-safe**: a record is never indexed before a lower id that precedes it
//! - **Resumable**: subscription loss triggers a catch-up from the frontier
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use notary_ledger::{Indexer, IndexerConfig, MemoryLedger, RecordId};
//!
//! async fn example() -> notary_ledger::Result<()> {
//!     let ledger = Arc::new(MemoryLedger::new());
//!     let indexer = Indexer::new(ledger, IndexerConfig::default());
//!
//!     let report = indexer.start().await?;
//!     println!("replayed {} records", report.records_indexed);
//!
//!     let record = indexer.by_id(RecordId(1))?;
//!     println!("{} -> {}", record.sender, record.recipient);
//!
//!     indexer.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod consistency;
pub mod error;
pub mod index;
pub mod indexer;
pub mod ledger;
pub mod memory;

pub use consistency::{check_consistency, fingerprint, ConsistencyReport, Fingerprint};
pub use error::{LedgerError, Result};
pub use index::{FoldOutcome, RecordIndex};
pub use indexer::{
    IndexState, Indexer, IndexerConfig, ObserverId, ObserverReceiver, ReplayReport,
};
pub use ledger::{Ledger, RecordFilter, Subscription};
pub use memory::{MemoryLedger, DEFAULT_SUBSCRIPTION_CAPACITY};

pub use notary_core::RecordId;
