//! Error types for the Notary Core.

use thiserror::Error;

/// Errors raised while parsing or constructing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid content identifier {input:?}: {reason}")]
    InvalidContentId { input: String, reason: String },

    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("invalid record id {0:?}")]
    InvalidRecordId(String),

    #[error("invalid account id: {0}")]
    InvalidAccountId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
