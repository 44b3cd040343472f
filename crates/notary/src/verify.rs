//! Verification: does a candidate file match a notarized record?
//!
//! The verifier is stateless. It looks the record up, hashes the candidate
//! with the same hasher the content store uses, and compares identifiers as
//! bytes, so letter case and `0x` prefixes never cause a false mismatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use notary_core::{hash, ContentId, NotarizationRecord, RecordId};
use notary_ledger::{Indexer, Ledger, LedgerError, RecordIndex};

use crate::error::VerifyError;

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the candidate hashes to the record's content identifier.
    pub matched: bool,
    /// The identifier stored in the record.
    pub expected: ContentId,
    /// The identifier of the candidate.
    pub supplied: ContentId,
    /// The record verified against, for provenance.
    pub record: NotarizationRecord,
}

/// Anything that can resolve a record id.
pub trait RecordSource {
    fn record(&self, id: RecordId) -> Result<Arc<NotarizationRecord>, LedgerError>;
}

impl<L: Ledger + 'static> RecordSource for Indexer<L> {
    fn record(&self, id: RecordId) -> Result<Arc<NotarizationRecord>, LedgerError> {
        self.by_id(id)
    }
}

impl RecordSource for RecordIndex {
    fn record(&self, id: RecordId) -> Result<Arc<NotarizationRecord>, LedgerError> {
        self.by_id(id).ok_or(LedgerError::NotFound(id))
    }
}

/// Checks candidates against records from a [`RecordSource`].
pub struct Verifier<'a, R: ?Sized> {
    records: &'a R,
}

impl<'a, R: RecordSource + ?Sized> Verifier<'a, R> {
    pub fn new(records: &'a R) -> Self {
        Self { records }
    }

    /// Hash `candidate` and compare it with record `id`.
    ///
    /// An unknown id is [`VerifyError::UnknownRecord`], never a mismatch.
    pub fn verify(&self, id: RecordId, candidate: &[u8]) -> Result<VerificationResult, VerifyError> {
        let record = self.records.record(id)?;
        Ok(self.compare(record, hash(candidate)))
    }

    /// Compare a client-computed identifier (any case, with or without `0x`)
    /// with record `id`.
    pub fn verify_identifier(
        &self,
        id: RecordId,
        supplied: &str,
    ) -> Result<VerificationResult, VerifyError> {
        let record = self.records.record(id)?;
        let supplied = ContentId::parse(supplied)?;
        Ok(self.compare(record, supplied))
    }

    fn compare(&self, record: Arc<NotarizationRecord>, supplied: ContentId) -> VerificationResult {
        let expected = record.content_id;
        let matched = expected == supplied;
        tracing::debug!(record_id = %record.id, matched, "verified candidate");

        VerificationResult {
            matched,
            expected,
            supplied,
            record: NotarizationRecord::clone(&record),
        }
    }
}
