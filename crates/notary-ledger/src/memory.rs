//! In-memory ledger for tests and local runs.
//!
//! Behaves like a well-formed chain client: ids increase strictly, queries
//! are authoritative, subscribers see appends in order. Fault injection hooks
//! let tests break those guarantees on purpose.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use notary_core::{Address, NewRecord, NotarizationRecord, RecordId, TxRef};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, RecordFilter, Subscription};

/// Default buffer size of each subscription.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 1024;

struct Subscriber {
    filter: RecordFilter,
    sender: mpsc::Sender<NotarizationRecord>,
}

struct Inner {
    records: Vec<NotarizationRecord>,
    subscribers: Vec<Subscriber>,
    available: bool,
    clock: Option<u64>,
    latency: Duration,
    tx_seq: u64,
}

impl Inner {
    fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("ledger is offline".into()))
        }
    }

    fn publish(&mut self, record: &NotarizationRecord) {
        self.subscribers.retain(|sub| {
            if !sub.filter.matches(record) {
                return !sub.sender.is_closed();
            }
            match sub.sender.try_send(record.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(record_id = %record.id, "subscriber buffer full, disconnecting");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
    }
}

/// An append-only ledger held in memory.
pub struct MemoryLedger {
    inner: Mutex<Inner>,
    first_id: u64,
    id_step: u64,
    capacity: usize,
}

impl MemoryLedger {
    /// Create an empty ledger whose first record gets id 1.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                subscribers: Vec::new(),
                available: true,
                clock: None,
                latency: Duration::ZERO,
                tx_seq: 0,
            }),
            first_id: 1,
            id_step: 1,
            capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
        }
    }

    /// Id assigned to the first appended record.
    pub fn with_first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id.max(1);
        self
    }

    /// Distance between consecutive ids. Values above 1 produce sparse ids.
    pub fn with_id_step(mut self, step: u64) -> Self {
        self.id_step = step.max(1);
        self
    }

    /// Buffer size of each subscription.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {e}")))
    }

    async fn delay(&self) -> Result<()> {
        let latency = self.lock()?.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn push(&self, inner: &mut Inner, record: NewRecord) -> NotarizationRecord {
        let id = match inner.records.last() {
            Some(last) => last.id.get().saturating_add(self.id_step),
            None => self.first_id,
        };
        let timestamp = inner.clock.unwrap_or_else(unix_seconds);
        inner.tx_seq += 1;
        let source_tx = TxRef::new(format!("0x{:064x}", inner.tx_seq));

        let record = record.into_record(RecordId(id), timestamp, source_tx);
        inner.records.push(record.clone());
        record
    }

    /// Take the ledger offline (or back online). Going offline drops every
    /// live subscription.
    pub fn set_available(&self, available: bool) -> Result<()> {
        let mut inner = self.lock()?;
        inner.available = available;
        if !available {
            inner.subscribers.clear();
        }
        Ok(())
    }

    /// Drop every live subscription without going offline.
    pub fn disconnect_subscribers(&self) -> Result<()> {
        self.lock()?.subscribers.clear();
        Ok(())
    }

    /// Fix the timestamp given to subsequent appends. `None` = wall clock.
    pub fn set_clock(&self, unix_seconds: Option<u64>) -> Result<()> {
        self.lock()?.clock = unix_seconds;
        Ok(())
    }

    /// Delay every ledger call by `latency`.
    pub fn set_latency(&self, latency: Duration) -> Result<()> {
        self.lock()?.latency = latency;
        Ok(())
    }

    /// Write a record into history without announcing it to subscribers,
    /// as if its live delivery was lost. Works while offline.
    pub fn inject(&self, record: NewRecord) -> Result<RecordId> {
        let mut inner = self.lock()?;
        Ok(self.push(&mut inner, record).id)
    }

    /// Announce already appended records in `[from, to]` again.
    pub fn redeliver(&self, from: RecordId, to: RecordId) -> Result<usize> {
        let mut inner = self.lock()?;
        let again: Vec<_> = inner
            .records
            .iter()
            .filter(|r| r.id >= from && r.id <= to)
            .cloned()
            .collect();
        for record in &again {
            inner.publish(record);
        }
        Ok(again.len())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        inner.subscribers.retain(|sub| !sub.sender.is_closed());
        Ok(inner.subscribers.len())
    }

    /// Number of records in history.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn latest_id(&self) -> Result<Option<RecordId>> {
        self.delay().await?;
        let inner = self.lock()?;
        inner.ensure_available()?;
        Ok(inner.records.last().map(|r| r.id))
    }

    async fn query(&self, from: RecordId, to: RecordId) -> Result<Vec<NotarizationRecord>> {
        self.delay().await?;
        let inner = self.lock()?;
        inner.ensure_available()?;

        // Records are kept in id order.
        let start = inner.records.partition_point(|r| r.id < from);
        Ok(inner.records[start..]
            .iter()
            .take_while(|r| r.id <= to)
            .cloned()
            .collect())
    }

    async fn subscribe(&self, filter: RecordFilter) -> Result<Subscription> {
        self.delay().await?;
        let mut inner = self.lock()?;
        inner.ensure_available()?;

        let (sender, subscription) = Subscription::channel(self.capacity);
        inner.subscribers.push(Subscriber { filter, sender });
        Ok(subscription)
    }

    async fn append(&self, record: NewRecord) -> Result<RecordId> {
        self.delay().await?;
        let mut inner = self.lock()?;
        inner.ensure_available()?;

        if record.recipient == Address::ZERO {
            return Err(LedgerError::Rejected("recipient is the zero address".into()));
        }

        let record = self.push(&mut inner, record);
        inner.publish(&record);
        tracing::debug!(record_id = %record.id, recipient = %record.recipient, "appended record");
        Ok(record.id)
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::hash;

    fn new_record(to: u8, body: &[u8]) -> NewRecord {
        NewRecord::new(
            Address::from_bytes([0xaa; 20]),
            Address::from_bytes([to; 20]),
            hash(body),
        )
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let ledger = MemoryLedger::new().with_first_id(7);

        let a = ledger.append(new_record(0xbb, b"a")).await.unwrap();
        let b = ledger.append(new_record(0xbb, b"b")).await.unwrap();

        assert_eq!(a, RecordId(7));
        assert_eq!(b, RecordId(8));
        assert_eq!(ledger.latest_id().await.unwrap(), Some(RecordId(8)));
    }

    #[tokio::test]
    async fn test_query_is_inclusive_and_sparse_aware() {
        let ledger = MemoryLedger::new().with_first_id(10).with_id_step(10);
        for body in [b"a", b"b", b"c", b"d"] {
            ledger.append(new_record(0xbb, body)).await.unwrap();
        }

        let ids: Vec<_> = ledger
            .query(RecordId(15), RecordId(30))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(ids, [20, 30]);

        assert!(ledger.query(RecordId(50), RecordId(40)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_filters_by_recipient() {
        let ledger = MemoryLedger::new();
        let mut sub = ledger
            .subscribe(RecordFilter::recipient(Address::from_bytes([0xbb; 20])))
            .await
            .unwrap();

        ledger.append(new_record(0xcc, b"skip")).await.unwrap();
        let wanted = ledger.append(new_record(0xbb, b"keep")).await.unwrap();

        assert_eq!(sub.next().await.unwrap().id, wanted);
    }

    #[tokio::test]
    async fn test_offline_ledger_fails_and_drops_subscribers() {
        let ledger = MemoryLedger::new();
        let mut sub = ledger.subscribe(RecordFilter::all()).await.unwrap();

        ledger.set_available(false).unwrap();
        assert!(sub.next().await.is_none());
        assert!(matches!(
            ledger.latest_id().await,
            Err(LedgerError::Unavailable(_))
        ));
        assert!(matches!(
            ledger.append(new_record(0xbb, b"x")).await,
            Err(LedgerError::Unavailable(_))
        ));

        // Injected records land even while offline.
        ledger.inject(new_record(0xbb, b"x")).unwrap();
        ledger.set_available(true).unwrap();
        assert_eq!(ledger.latest_id().await.unwrap(), Some(RecordId(1)));
    }

    #[tokio::test]
    async fn test_full_subscriber_is_disconnected() {
        let ledger = MemoryLedger::new().with_capacity(2);
        let mut sub = ledger.subscribe(RecordFilter::all()).await.unwrap();

        for body in [b"1", b"2", b"3"] {
            ledger.append(new_record(0xbb, body)).await.unwrap();
        }

        assert_eq!(ledger.subscriber_count().unwrap(), 0);
        assert_eq!(sub.next().await.unwrap().id, RecordId(1));
        assert_eq!(sub.next().await.unwrap().id, RecordId(2));
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_redeliver_and_clock() {
        let ledger = MemoryLedger::new();
        ledger.set_clock(Some(1_000)).unwrap();
        ledger.append(new_record(0xbb, b"1")).await.unwrap();
        ledger.set_clock(Some(500)).unwrap();
        ledger.append(new_record(0xbb, b"2")).await.unwrap();

        let mut sub = ledger.subscribe(RecordFilter::all()).await.unwrap();
        assert_eq!(ledger.redeliver(RecordId(1), RecordId(2)).unwrap(), 2);

        let first = sub.next().await.unwrap();
        let second = sub.next().await.unwrap();
        assert_eq!((first.id, first.timestamp), (RecordId(1), 1_000));
        assert_eq!((second.id, second.timestamp), (RecordId(2), 500));
    }

    #[tokio::test]
    async fn test_zero_recipient_rejected() {
        let ledger = MemoryLedger::new();
        let record = NewRecord::new(Address::from_bytes([0xaa; 20]), Address::ZERO, hash(b"x"));

        assert!(matches!(
            ledger.append(record).await,
            Err(LedgerError::Rejected(_))
        ));
        assert!(ledger.is_empty().unwrap());
    }
}
