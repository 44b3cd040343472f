//! Consistency verification between the index and the ledger.
//!
//! An index and a fresh replay of the ledger can be compared without
//! shipping records around by computing deterministic fingerprints.

use std::fmt;

use notary_core::{NotarizationRecord, RecordId};

use crate::error::Result;
use crate::index::RecordIndex;
use crate::ledger::Ledger;

/// Rolling BLAKE3 digest over an ordered run of records.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}...)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Compute the fingerprint of `records`, which must be in id order.
///
/// Algorithm:
/// 1. H = Blake3("notary-index-v1:")
/// 2. for each record: H.update(id as u64 BE || content_id)
/// 3. return H
pub fn fingerprint<'a>(records: impl IntoIterator<Item = &'a NotarizationRecord>) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"notary-index-v1:");

    for record in records {
        hasher.update(&record.id.get().to_be_bytes());
        hasher.update(record.content_id.as_bytes());
    }

    Fingerprint(*hasher.finalize().as_bytes())
}

impl RecordIndex {
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self.iter())
    }
}

/// Result of comparing the index against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyReport {
    /// The index equals the ledger prefix and the ledger has nothing newer.
    Consistent { frontier: RecordId, fingerprint: Fingerprint },
    /// The index equals the ledger prefix but the ledger has moved on.
    Behind { frontier: RecordId, ledger_latest: RecordId },
    /// The index disagrees with the ledger at `first_mismatch`.
    Diverged { first_mismatch: RecordId },
}

impl ConsistencyReport {
    /// True unless the index disagrees with the ledger.
    pub fn is_sound(&self) -> bool {
        !matches!(self, ConsistencyReport::Diverged { .. })
    }
}

/// Replay `ledger` up to the frontier of `local` and compare.
pub async fn check_consistency<L: Ledger + ?Sized>(
    ledger: &L,
    local: &[NotarizationRecord],
    frontier: RecordId,
    batch_size: u64,
) -> Result<ConsistencyReport> {
    let ledger_latest = ledger.latest_id().await?.unwrap_or_default();

    let mut replay = RecordIndex::new();
    let mut from = RecordId(1);
    while from <= frontier {
        let to = RecordId(from.get().saturating_add(batch_size.max(1) - 1).min(frontier.get()));
        let records = ledger.query(from, to).await?;
        replay.apply_range(records, to);
        from = to.next();
        if to == frontier {
            break;
        }
    }

    if replay.fingerprint() != fingerprint(local) {
        let first_mismatch = first_mismatch(replay.iter(), local.iter()).unwrap_or(frontier);
        tracing::warn!(%first_mismatch, "index diverges from ledger");
        return Ok(ConsistencyReport::Diverged { first_mismatch });
    }

    if ledger_latest > frontier {
        return Ok(ConsistencyReport::Behind {
            frontier,
            ledger_latest,
        });
    }

    Ok(ConsistencyReport::Consistent {
        frontier,
        fingerprint: fingerprint(local),
    })
}

/// The lowest id at which two ordered record runs differ.
fn first_mismatch<'a>(
    mut expected: impl Iterator<Item = &'a NotarizationRecord>,
    mut actual: impl Iterator<Item = &'a NotarizationRecord>,
) -> Option<RecordId> {
    loop {
        match (expected.next(), actual.next()) {
            (None, None) => return None,
            (Some(e), None) => return Some(e.id),
            (None, Some(a)) => return Some(a.id),
            (Some(e), Some(a)) => {
                if e.id != a.id {
                    return Some(e.id.min(a.id));
                }
                if e.content_id != a.content_id {
                    return Some(e.id);
                }
            }
        }
    }
}
