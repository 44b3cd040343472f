//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use notary_core::{hash, AccountId, Address, NewRecord, RecordId};
use notary_ledger::{Indexer, IndexerConfig, Ledger, MemoryLedger};
use notary_store::MemoryContentStore;

/// A test fixture with an in-memory store and ledger.
pub struct TestFixture {
    pub store: Arc<MemoryContentStore>,
    pub ledger: Arc<MemoryLedger>,
}

impl TestFixture {
    /// Create a new test fixture with an empty store and ledger.
    pub fn new() -> Self {
        Self::with_ledger(MemoryLedger::new())
    }

    /// Create with a preconfigured ledger.
    pub fn with_ledger(ledger: MemoryLedger) -> Self {
        Self {
            store: Arc::new(MemoryContentStore::new()),
            ledger: Arc::new(ledger),
        }
    }

    /// An indexer over this fixture's ledger, tuned for fast tests.
    pub fn indexer(&self) -> Indexer<MemoryLedger> {
        Indexer::new(Arc::clone(&self.ledger), fast_indexer_config())
    }

    /// Append `count` filler records from party 0 to party 1.
    pub async fn preload(&self, count: usize) -> notary_ledger::Result<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let body = format!("filler-{i}");
            let record = NewRecord::new(party(0), party(1), hash(body.as_bytes()));
            ids.push(self.ledger.append(record).await?);
        }
        Ok(ids)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A deterministic ledger address for party `index`.
pub fn party(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xf0;
    bytes[19] = index;
    Address::from_bytes(bytes)
}

/// Create multiple addresses for multi-party tests.
pub fn parties(count: u8) -> Vec<Address> {
    (0..count).map(party).collect()
}

/// An authenticated account named `name@example.com`.
pub fn account(name: &str) -> AccountId {
    AccountId::new(format!("{name}@example.com")).expect("account ids with a domain are non-empty")
}

/// Indexer settings with short backoff and small batches.
pub fn fast_indexer_config() -> IndexerConfig {
    IndexerConfig::default()
        .with_reconnect_backoff(Duration::from_millis(10), Duration::from_millis(100))
        .with_replay_batch_size(4)
}

/// Install a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
