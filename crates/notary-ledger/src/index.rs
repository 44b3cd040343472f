//! The record index: an idempotent fold over the ledger's record stream.
//!
//! The index only ever holds a prefix of the ledger. It tracks a `frontier`
//! (every ledger record with `id <= frontier` is indexed) and parks live
//! records that arrive ahead of it until a range query proves nothing is
//! missing in between. Ledger ids need not be dense.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use notary_core::{Address, NotarizationRecord, RecordId};

/// What happened when a live record was folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Records newly indexed, in id order. The folded record is among them.
    Indexed(Vec<Arc<NotarizationRecord>>),
    /// The record was already indexed or already pending.
    Duplicate,
    /// The record is ahead of the frontier; see [`RecordIndex::gap`].
    Deferred,
}

/// By-id and by-recipient views over a ledger prefix.
#[derive(Debug, Default)]
pub struct RecordIndex {
    by_id: BTreeMap<RecordId, Arc<NotarizationRecord>>,
    /// Ascending ids per recipient.
    by_recipient: HashMap<Address, Vec<RecordId>>,
    frontier: RecordId,
    pending: BTreeMap<RecordId, NotarizationRecord>,
}

impl RecordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest id such that every ledger record at or below it is indexed.
    /// `RecordId(0)` before anything is known.
    pub fn frontier(&self) -> RecordId {
        self.frontier
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Number of live records waiting for the frontier to reach them.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The id range that must be queried before pending records can be
    /// released, as `(from, to)` inclusive.
    pub fn gap(&self) -> Option<(RecordId, RecordId)> {
        let (&first_pending, _) = self.pending.first_key_value()?;
        let to = first_pending.prev()?;
        Some((self.frontier.next(), to))
    }

    fn contains(&self, id: RecordId) -> bool {
        id <= self.frontier || self.by_id.contains_key(&id) || self.pending.contains_key(&id)
    }

    fn insert(&mut self, record: NotarizationRecord) -> Arc<NotarizationRecord> {
        let record = Arc::new(record);
        self.frontier = self.frontier.max(record.id);
        self.by_recipient
            .entry(record.recipient)
            .or_default()
            .push(record.id);
        self.by_id.insert(record.id, Arc::clone(&record));
        record
    }

    fn release_pending(&mut self, indexed: &mut Vec<Arc<NotarizationRecord>>) {
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() != self.frontier.next() {
                break;
            }
            let record = entry.remove();
            indexed.push(self.insert(record));
        }
    }

    /// Fold one record from the live subscription.
    pub fn apply_live(&mut self, record: NotarizationRecord) -> FoldOutcome {
        if self.contains(record.id) {
            tracing::trace!(record_id = %record.id, "discarding duplicate delivery");
            return FoldOutcome::Duplicate;
        }

        if record.id != self.frontier.next() {
            tracing::debug!(
                record_id = %record.id,
                frontier = %self.frontier,
                "record ahead of frontier, deferring"
            );
            self.pending.insert(record.id, record);
            return FoldOutcome::Deferred;
        }

        let mut indexed = vec![self.insert(record)];
        self.release_pending(&mut indexed);
        FoldOutcome::Indexed(indexed)
    }

    /// Fold the result of a range query that covers `frontier + 1 ..= through`.
    ///
    /// The range is authoritative: afterwards the frontier is at least
    /// `through`, and pending records inside it that the query did not
    /// return are dropped.
    pub fn apply_range(
        &mut self,
        mut records: Vec<NotarizationRecord>,
        through: RecordId,
    ) -> Vec<Arc<NotarizationRecord>> {
        records.sort_by_key(|r| r.id);

        let mut indexed = Vec::new();
        for record in records {
            if record.id > through {
                break;
            }
            if record.id <= self.frontier || self.by_id.contains_key(&record.id) {
                continue;
            }
            self.pending.remove(&record.id);
            indexed.push(self.insert(record));
        }

        // Anything still pending at or below `through` was not confirmed.
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() > through {
                break;
            }
            tracing::warn!(
                record_id = %entry.key(),
                through = %through,
                "pending record absent from range query, discarding"
            );
            entry.remove();
        }

        self.frontier = self.frontier.max(through);
        self.release_pending(&mut indexed);
        indexed
    }

    pub fn by_id(&self, id: RecordId) -> Option<Arc<NotarizationRecord>> {
        self.by_id.get(&id).cloned()
    }

    /// Records sent to `recipient`, most recent (highest id) first.
    pub fn by_recipient(&self, recipient: &Address) -> Vec<Arc<NotarizationRecord>> {
        self.by_recipient
            .get(recipient)
            .map(|ids| {
                ids.iter()
                    .rev()
                    .filter_map(|id| self.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every indexed record in ledger order.
    pub fn all(&self) -> Vec<Arc<NotarizationRecord>> {
        self.by_id.values().cloned().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &NotarizationRecord> + '_ {
        self.by_id.values().map(|r| r.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::{hash, NewRecord, TxRef};

    fn record(id: u64, recipient: u8, timestamp: u64) -> NotarizationRecord {
        NewRecord::new(
            Address::from_bytes([0xaa; 20]),
            Address::from_bytes([recipient; 20]),
            hash(&id.to_be_bytes()),
        )
        .into_record(RecordId(id), timestamp, TxRef::new(format!("0x{id:x}")))
    }

    fn ids(records: &[Arc<NotarizationRecord>]) -> Vec<u64> {
        records.iter().map(|r| r.id.get()).collect()
    }

    #[test]
    fn test_replay_then_overlapping_live() {
        let mut index = RecordIndex::new();
        let replayed = index.apply_range(
            vec![record(1, 0xbb, 0), record(2, 0xbb, 0), record(3, 0xbb, 0)],
            RecordId(3),
        );
        assert_eq!(ids(&replayed), [1, 2, 3]);

        assert_eq!(index.apply_live(record(2, 0xbb, 0)), FoldOutcome::Duplicate);
        assert_eq!(index.apply_live(record(3, 0xbb, 0)), FoldOutcome::Duplicate);
        match index.apply_live(record(4, 0xbb, 0)) {
            FoldOutcome::Indexed(v) => assert_eq!(ids(&v), [4]),
            other => panic!("expected Indexed, got {other:?}"),
        }

        assert_eq!(ids(&index.all()), [1, 2, 3, 4]);
        assert_eq!(index.frontier(), RecordId(4));
    }

    #[test]
    fn test_by_recipient_most_recent_first_ignores_timestamps() {
        let mut index = RecordIndex::new();
        index.apply_range(
            vec![
                record(1, 0xbb, 300),
                record(2, 0xcc, 200),
                record(3, 0xbb, 100),
                record(4, 0xbb, 200),
            ],
            RecordId(4),
        );

        let bob = index.by_recipient(&Address::from_bytes([0xbb; 20]));
        assert_eq!(ids(&bob), [4, 3, 1]);
        assert!(bob.iter().all(|r| r.recipient == Address::from_bytes([0xbb; 20])));

        assert!(index.by_recipient(&Address::from_bytes([0xdd; 20])).is_empty());
    }

    #[test]
    fn test_gap_defers_until_range_confirms() {
        let mut index = RecordIndex::new();
        index.apply_range(vec![record(1, 0xbb, 0)], RecordId(1));

        assert_eq!(index.apply_live(record(4, 0xbb, 0)), FoldOutcome::Deferred);
        assert_eq!(index.apply_live(record(4, 0xbb, 0)), FoldOutcome::Duplicate);
        assert_eq!(index.gap(), Some((RecordId(2), RecordId(3))));
        assert!(index.by_id(RecordId(4)).is_none());

        // Id 2 does not exist; 3 does.
        let released = index.apply_range(vec![record(3, 0xbb, 0)], RecordId(3));
        assert_eq!(ids(&released), [3, 4]);
        assert_eq!(index.gap(), None);
        assert_eq!(index.pending_len(), 0);
        assert_eq!(index.frontier(), RecordId(4));
    }

    #[test]
    fn test_range_discards_unconfirmed_pending() {
        let mut index = RecordIndex::new();
        index.apply_live(record(3, 0xbb, 0));
        assert_eq!(index.gap(), Some((RecordId(1), RecordId(2))));

        let released = index.apply_range(vec![record(1, 0xbb, 0)], RecordId(5));
        assert_eq!(ids(&released), [1]);
        assert_eq!(index.pending_len(), 0);
        assert_eq!(index.frontier(), RecordId(5));
    }

    #[test]
    fn test_live_in_order_releases_contiguous_pending() {
        let mut index = RecordIndex::new();
        assert_eq!(index.apply_live(record(2, 0xbb, 0)), FoldOutcome::Deferred);

        match index.apply_live(record(1, 0xbb, 0)) {
            FoldOutcome::Indexed(v) => assert_eq!(ids(&v), [1, 2]),
            other => panic!("expected Indexed, got {other:?}"),
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use proptest::sample::Index;
        use std::collections::BTreeSet;

        proptest! {
            /// Any delivery order, with duplicates and losses, leaves the index
            /// holding exactly the ledger prefix up to its frontier.
            #[test]
            fn fold_always_holds_a_prefix(
                ledger_ids in proptest::collection::btree_set(1u64..200, 1..40),
                deliveries in proptest::collection::vec(any::<Index>(), 0..80),
            ) {
                let ledger: Vec<u64> = ledger_ids.iter().copied().collect();
                let mut index = RecordIndex::new();

                for pick in deliveries {
                    let id = ledger[pick.index(ledger.len())];
                    if index.apply_live(record(id, 0xbb, 0)) == FoldOutcome::Deferred {
                        while let Some((from, to)) = index.gap() {
                            let range = ledger
                                .iter()
                                .filter(|&&i| i >= from.get() && i <= to.get())
                                .map(|&i| record(i, 0xbb, 0))
                                .collect();
                            index.apply_range(range, to);
                        }
                    }

                    let frontier = index.frontier().get();
                    let expected: BTreeSet<u64> =
                        ledger.iter().copied().filter(|&i| i <= frontier).collect();
                    let held: BTreeSet<u64> = index.all().iter().map(|r| r.id.get()).collect();
                    prop_assert_eq!(held, expected);
                    prop_assert_eq!(index.pending_len(), 0);
                }

                let all = index.all();
                prop_assert!(all.windows(2).all(|w| w[0].id < w[1].id));
            }
        }
    }
}
