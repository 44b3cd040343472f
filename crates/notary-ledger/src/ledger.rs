//! Ledger abstraction: the append-only, totally ordered record source.
//!
//! The ledger itself (consensus, settlement, finality) lives outside this
//! crate. Implementations adapt a concrete chain client to this interface;
//! [`crate::MemoryLedger`] is the in-process reference used by tests.

use async_trait::async_trait;
use notary_core::{Address, NewRecord, NotarizationRecord, RecordId};
use tokio::sync::mpsc;

use crate::error::Result;

/// Selects which live records a subscription receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only records sent to this address. `None` = every record.
    pub recipient: Option<Address>,
}

impl RecordFilter {
    /// Match every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match records sent to `recipient`.
    pub fn recipient(recipient: Address) -> Self {
        Self {
            recipient: Some(recipient),
        }
    }

    pub fn matches(&self, record: &NotarizationRecord) -> bool {
        self.recipient
            .map_or(true, |recipient| record.is_addressed_to(&recipient))
    }
}

/// A live feed of newly appended records.
///
/// Records arrive in ledger order but may be redelivered or skipped by the
/// underlying client. Dropping the subscription cancels it. When the feed
/// ends (`next` returns `None`) the subscription is lost and the consumer
/// must re-query from its last known id.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<NotarizationRecord>,
}

impl Subscription {
    /// Create a bounded channel and the subscription reading from it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<NotarizationRecord>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::from_receiver(rx))
    }

    pub fn from_receiver(receiver: mpsc::Receiver<NotarizationRecord>) -> Self {
        Self { receiver }
    }

    /// Next live record, or `None` once the subscription is lost.
    pub async fn next(&mut self) -> Option<NotarizationRecord> {
        self.receiver.recv().await
    }
}

/// The ledger interface consumed by the indexer and the submission pipeline.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Highest record id appended so far, or `None` for an empty ledger.
    async fn latest_id(&self) -> Result<Option<RecordId>>;

    /// Records with `from <= id <= to`, ascending by id.
    ///
    /// The result is authoritative for the whole range: an id inside it that
    /// is not returned does not exist.
    async fn query(&self, from: RecordId, to: RecordId) -> Result<Vec<NotarizationRecord>>;

    /// Receive records appended after this call returns.
    async fn subscribe(&self, filter: RecordFilter) -> Result<Subscription>;

    /// Append a record. The ledger assigns its id, timestamp, and transaction.
    async fn append(&self, record: NewRecord) -> Result<RecordId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::{hash, TxRef};

    fn record(id: u64, recipient: u8) -> NotarizationRecord {
        NewRecord::new(
            Address::from_bytes([0xaa; 20]),
            Address::from_bytes([recipient; 20]),
            hash(&id.to_be_bytes()),
        )
        .into_record(RecordId(id), 0, TxRef::new("0x00"))
    }

    #[test]
    fn test_filter_matches() {
        let bob = Address::from_bytes([0xbb; 20]);

        assert!(RecordFilter::all().matches(&record(1, 0xbb)));
        assert!(RecordFilter::recipient(bob).matches(&record(1, 0xbb)));
        assert!(!RecordFilter::recipient(bob).matches(&record(1, 0xcc)));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_dropped() {
        let (tx, mut sub) = Subscription::channel(4);
        tx.send(record(1, 0xbb)).await.unwrap();
        drop(tx);

        assert_eq!(sub.next().await.map(|r| r.id), Some(RecordId(1)));
        assert!(sub.next().await.is_none());
    }
}
