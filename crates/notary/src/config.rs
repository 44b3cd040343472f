//! Configuration for the Notary.

use notary_ledger::IndexerConfig;

/// Default upper bound on a single document (32 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 32 * 1024 * 1024;

/// Configuration for the Notary.
#[derive(Debug, Clone)]
pub struct NotaryConfig {
    /// Indexer deadlines, backoff, and batch size.
    pub indexer: IndexerConfig,
    /// Largest document accepted for storage or verification.
    pub max_document_bytes: usize,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            indexer: IndexerConfig::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl NotaryConfig {
    pub fn with_indexer(mut self, indexer: IndexerConfig) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }
}
