//! Error types for the ledger module.

use notary_core::RecordId;
use thiserror::Error;

/// Errors that can occur while reading, indexing, or appending to the ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached, a deadline expired, or the index has
    /// not finished its initial replay. Transient; retry later.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// No record with this id has been indexed.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The ledger refused an append.
    #[error("append rejected: {0}")]
    Rejected(String),

    /// `start` was called on an indexer that is already running or stopped.
    #[error("indexer already started")]
    AlreadyStarted,
}

impl LedgerError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }

    pub(crate) fn deadline(what: &str) -> Self {
        LedgerError::Unavailable(format!("deadline expired: {what}"))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
