//! Error types for the Notary.

use notary_core::{CoreError, RecordId};
use notary_ledger::LedgerError;
use notary_store::StoreError;
use thiserror::Error;

/// Errors from verifying a candidate against a record.
///
/// A content mismatch is not an error; it is a successful
/// [`crate::VerificationResult`] with `matched == false`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// No record with this id exists in the index.
    #[error("unknown record: {0}")]
    UnknownRecord(RecordId),

    /// The index could not answer. Transient; retry later.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The supplied identifier is not a well-formed content identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] CoreError),
}

impl From<LedgerError> for VerifyError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(id) => VerifyError::UnknownRecord(id),
            LedgerError::Unavailable(reason) => VerifyError::LedgerUnavailable(reason),
            other => VerifyError::LedgerUnavailable(other.to_string()),
        }
    }
}

/// Errors that can occur during Notary operations.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Malformed identifier or account.
    #[error("invalid input: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Ledger or index error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Verification error.
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),

    /// Document exceeds the configured size limit.
    #[error("document too large: {size} bytes exceeds limit of {limit}")]
    DocumentTooLarge { size: usize, limit: usize },
}

impl NotaryError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotaryError::Store(e) => e.is_retryable(),
            NotaryError::Ledger(e) => e.is_retryable(),
            NotaryError::Verify(VerifyError::LedgerUnavailable(_)) => true,
            _ => false,
        }
    }
}

/// Result type for Notary operations.
pub type Result<T> = std::result::Result<T, NotaryError>;
