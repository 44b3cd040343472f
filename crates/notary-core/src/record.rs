//! Notarization records: immutable ledger facts.
//!
//! A record binds a sender, a recipient, and a content identifier at a
//! ledger-assigned position. Records are never edited; the ledger has no
//! update or delete.

use serde::{Deserialize, Serialize};

use crate::hasher::ContentId;
use crate::types::{Address, RecordId, TxRef};

/// A record as observed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizationRecord {
    /// Ledger sequence number. The ordering and dedup key.
    pub id: RecordId,
    pub sender: Address,
    pub recipient: Address,
    pub content_id: ContentId,
    /// Free-form reference supplied by the sender (a URI, a note, or empty).
    pub reference: String,
    /// Ledger wall-clock time in unix seconds. Display only; never ordered on.
    pub timestamp: u64,
    /// Transaction that appended the record.
    pub source_tx: TxRef,
}

impl NotarizationRecord {
    /// Whether this record was sent to `address`.
    pub fn is_addressed_to(&self, address: &Address) -> bool {
        &self.recipient == address
    }
}

/// The caller-supplied part of a record, before the ledger assigns a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub sender: Address,
    pub recipient: Address,
    pub content_id: ContentId,
    pub reference: String,
}

impl NewRecord {
    pub fn new(sender: Address, recipient: Address, content_id: ContentId) -> Self {
        Self {
            sender,
            recipient,
            content_id,
            reference: String::new(),
        }
    }

    /// Attach a free-form reference.
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    /// Complete the record with ledger-assigned fields.
    pub fn into_record(self, id: RecordId, timestamp: u64, source_tx: TxRef) -> NotarizationRecord {
        NotarizationRecord {
            id,
            sender: self.sender,
            recipient: self.recipient,
            content_id: self.content_id,
            reference: self.reference,
            timestamp,
            source_tx,
        }
    }
}
