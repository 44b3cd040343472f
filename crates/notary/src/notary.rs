//! The Notary: unified API for the notarization system.
//!
//! The Notary brings together document storage, the ledger, and its index
//! into one handle for submitting, browsing, and verifying documents.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use notary_core::{
    AccountId, Address, ContentId, DocumentSummary, NewRecord, NotarizationRecord, RecordId,
    StoredDocument,
};
use notary_ledger::{
    ConsistencyReport, IndexState, Indexer, Ledger, LedgerError, ObserverId, ObserverReceiver,
    ReplayReport,
};
use notary_store::{ContentStore, ContentStoreExt};

use crate::config::NotaryConfig;
use crate::error::{NotaryError, Result, VerifyError};
use crate::verify::{VerificationResult, Verifier};

/// A document to store and notarize in one step.
#[derive(Debug, Clone)]
pub struct Submission {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
    pub sender: Address,
    pub recipient: Address,
    /// Free-form reference recorded on the ledger. Empty by default.
    pub reference: String,
}

impl Submission {
    pub fn new(bytes: impl Into<Bytes>, sender: Address, recipient: Address) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: "application/octet-stream".into(),
            file_name: String::new(),
            sender,
            recipient,
            reference: String::new(),
        }
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitted {
    pub content_id: ContentId,
    pub record_id: RecordId,
}

/// The main Notary struct.
///
/// Provides a unified API for:
/// - Storing documents and listing an owner's uploads
/// - Notarizing stored documents on the ledger
/// - Browsing records by id and by recipient
/// - Verifying candidate files against records
pub struct Notary<S: ContentStore, L: Ledger + 'static> {
    /// The document store.
    store: Arc<S>,
    /// The ledger and its index.
    indexer: Indexer<L>,
    /// Configuration.
    config: NotaryConfig,
}

impl<S: ContentStore, L: Ledger + 'static> Notary<S, L> {
    /// Create a notary over existing store and ledger handles.
    ///
    /// Call [`Notary::start`] before querying records.
    pub fn new(store: Arc<S>, ledger: Arc<L>, config: NotaryConfig) -> Self {
        let indexer = Indexer::new(ledger, config.indexer.clone());
        Self {
            store,
            indexer,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<L> {
        self.indexer.ledger()
    }

    pub fn indexer(&self) -> &Indexer<L> {
        &self.indexer
    }

    pub fn config(&self) -> &NotaryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Replay the ledger and start following it.
    pub async fn start(&self) -> Result<ReplayReport> {
        Ok(self.indexer.start().await?)
    }

    /// Stop following the ledger. Queries keep serving the last snapshot.
    pub async fn shutdown(&self) {
        self.indexer.shutdown().await;
        tracing::info!("notary shut down");
    }

    pub fn state(&self) -> IndexState {
        self.indexer.state()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    fn check_size(&self, size: usize) -> Result<()> {
        let limit = self.config.max_document_bytes;
        if size > limit {
            return Err(NotaryError::DocumentTooLarge { size, limit });
        }
        Ok(())
    }

    /// Store document bytes for `owner`. Identical bytes are stored once;
    /// later uploads return the existing identifier.
    pub async fn store_document(
        &self,
        bytes: impl Into<Bytes>,
        mime_type: &str,
        file_name: &str,
        owner: &AccountId,
    ) -> Result<ContentId> {
        let bytes = bytes.into();
        self.check_size(bytes.len())?;
        Ok(self.store.put(bytes, mime_type, file_name, owner).await?)
    }

    /// Fetch a stored document.
    pub async fn document(&self, id: &ContentId) -> Result<StoredDocument> {
        Ok(self.store.get(id).await?)
    }

    /// Documents first uploaded by `owner`, oldest first.
    pub async fn documents(&self, owner: &AccountId) -> Result<Vec<DocumentSummary>> {
        Ok(self.store.list(owner).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notarization
    // ─────────────────────────────────────────────────────────────────────────

    /// Store the document, then append its notarization record.
    ///
    /// The record becomes queryable once the indexer folds it; use
    /// [`Notary::wait_for_record`] to await that.
    pub async fn submit(&self, owner: &AccountId, submission: Submission) -> Result<Submitted> {
        let content_id = self
            .store_document(
                submission.bytes,
                &submission.mime_type,
                &submission.file_name,
                owner,
            )
            .await?;

        let record = NewRecord::new(submission.sender, submission.recipient, content_id)
            .reference(submission.reference);
        let record_id = self.ledger().append(record).await?;

        tracing::info!(%content_id, %record_id, "document notarized");
        Ok(Submitted {
            content_id,
            record_id,
        })
    }

    /// Notarize a document that is already stored.
    pub async fn notarize(
        &self,
        content_id: ContentId,
        sender: Address,
        recipient: Address,
        reference: &str,
    ) -> Result<RecordId> {
        if !self.store.has(&content_id).await? {
            return Err(notary_store::StoreError::NotFound(content_id).into());
        }
        let record = NewRecord::new(sender, recipient, content_id).reference(reference);
        Ok(self.ledger().append(record).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a record by id.
    pub fn record(&self, id: RecordId) -> Result<Arc<NotarizationRecord>> {
        Ok(self.indexer.by_id(id)?)
    }

    /// Records sent to `recipient`, most recent first.
    pub fn inbox(&self, recipient: &Address) -> Result<Vec<Arc<NotarizationRecord>>> {
        Ok(self.indexer.by_recipient(recipient)?)
    }

    /// Every indexed record in ledger order.
    pub fn records(&self) -> Result<Vec<Arc<NotarizationRecord>>> {
        Ok(self.indexer.all()?)
    }

    /// The stored document a record refers to.
    pub async fn document_for_record(&self, id: RecordId) -> Result<StoredDocument> {
        let record = self.record(id)?;
        self.document(&record.content_id).await
    }

    /// Wait until record `id` is indexed, failing after `deadline`.
    pub async fn wait_for_record(
        &self,
        id: RecordId,
        deadline: Duration,
    ) -> Result<Arc<NotarizationRecord>> {
        // Register before looking so a fold in between is not missed.
        let (observer, mut indexed) = self.indexer.register_observer()?;
        let found = self.await_record(id, &mut indexed, deadline).await;
        self.indexer.unregister_observer(observer)?;
        found
    }

    async fn await_record(
        &self,
        id: RecordId,
        indexed: &mut ObserverReceiver,
        deadline: Duration,
    ) -> Result<Arc<NotarizationRecord>> {
        match self.indexer.by_id(id) {
            Ok(record) => return Ok(record),
            Err(LedgerError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let wait = async {
            while let Some(record) = indexed.recv().await {
                if record.id == id {
                    return Some(record);
                }
            }
            None
        };

        match tokio::time::timeout(deadline, wait).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(LedgerError::Unavailable("indexer stopped".into()).into()),
            Err(_) => Err(LedgerError::Unavailable(format!(
                "deadline expired: record {id} not indexed"
            ))
            .into()),
        }
    }

    pub fn register_observer(&self) -> Result<(ObserverId, ObserverReceiver)> {
        Ok(self.indexer.register_observer()?)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> Result<bool> {
        Ok(self.indexer.unregister_observer(id)?)
    }

    /// Compare the index with a fresh replay of the ledger.
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        Ok(self.indexer.check_consistency().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether `candidate` is the document notarized by record `id`.
    ///
    /// An unknown id is reported before the candidate's size is checked.
    pub fn verify(&self, id: RecordId, candidate: &[u8]) -> Result<VerificationResult> {
        self.indexer.by_id(id).map_err(VerifyError::from)?;
        self.check_size(candidate.len())?;
        Ok(Verifier::new(&self.indexer).verify(id, candidate)?)
    }

    /// Check a client-computed identifier against record `id`.
    pub fn verify_identifier(&self, id: RecordId, supplied: &str) -> Result<VerificationResult> {
        Ok(Verifier::new(&self.indexer).verify_identifier(id, supplied)?)
    }
}
