//! Proptest generators and seeded corpora for property-based testing.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use notary_core::{AccountId, Address, ContentId, NewRecord, NotarizationRecord, RecordId, TxRef};

/// Generate a random ContentId.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    any::<[u8; 32]>().prop_map(ContentId::from_bytes)
}

/// Generate a random Address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a valid record id (ids start at 1).
pub fn record_id() -> impl Strategy<Value = RecordId> {
    (1u64..=u64::MAX / 2).prop_map(RecordId)
}

/// Generate an authenticated account id.
pub fn account_id() -> impl Strategy<Value = AccountId> {
    "[a-z]{1,12}@example\\.com".prop_filter_map("non-empty account", |s| AccountId::new(s).ok())
}

/// Generate document bytes of specified max length.
pub fn document_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a free-form reference: empty, a URI, or arbitrary text.
pub fn reference() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z0-9]{8,46}".prop_map(|cid| format!("ipfs://{cid}")),
        ".{0,40}",
    ]
}

/// Generate the caller-supplied part of a record.
pub fn new_record() -> impl Strategy<Value = NewRecord> {
    (address(), address(), content_id(), reference()).prop_map(
        |(sender, recipient, content_id, reference)| {
            NewRecord::new(sender, recipient, content_id).reference(reference)
        },
    )
}

/// Generate a complete record.
pub fn record() -> impl Strategy<Value = NotarizationRecord> {
    (new_record(), record_id(), any::<u32>()).prop_map(|(record, id, timestamp)| {
        record.into_record(id, u64::from(timestamp), TxRef::new(format!("0x{:x}", id.get())))
    })
}

/// Strictly ascending, possibly sparse, ledger ids.
pub fn ledger_ids(max_id: u64, max_len: usize) -> impl Strategy<Value = Vec<RecordId>> {
    prop::collection::btree_set(1..=max_id.max(1), 0..=max_len)
        .prop_map(|ids| ids.into_iter().map(RecordId).collect())
}

/// Every textual spelling of `id` that parsing must accept: with `0x`, `0X`,
/// or no prefix, in lower, upper, or mixed case.
pub fn identifier_spelling(id: ContentId) -> impl Strategy<Value = String> {
    (0..3usize, any::<u64>()).prop_map(move |(prefix, case_mask)| {
        let hex: String = id
            .to_hex()
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if case_mask & (1 << (i % 64)) != 0 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect();
        match prefix {
            0 => format!("0x{hex}"),
            1 => format!("0X{hex}"),
            _ => hex,
        }
    })
}

/// A reproducible corpus of distinct-length random documents.
///
/// Useful for collision checks too large to run through proptest shrinking.
pub fn random_corpus(seed: u64, count: usize, max_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let mut doc = vec![0u8; rng.gen_range(0..=max_len)];
            rng.fill(&mut doc[..]);
            doc
        })
        .collect()
}
