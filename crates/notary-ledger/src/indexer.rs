//! The indexer: keeps a [`RecordIndex`] in step with the ledger.
//!
//! One background task owns every mutation of the index. It replays history,
//! follows the live subscription, fills gaps, and recovers from subscription
//! loss. Queries read the shared index under a reader lock and always see a
//! complete ledger prefix.
//!
//! ```text
//! Uninitialized --start--> Replaying --ok--> Live <--catch-up-- Degraded
//!       ^                      |              |                    ^
//!       +-------- error -------+              +-- subscription lost+
//!
//! any state --shutdown--> Stopped
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use notary_core::{Address, NotarizationRecord, RecordId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::consistency::{self, ConsistencyReport};
use crate::error::{LedgerError, Result};
use crate::index::{FoldOutcome, RecordIndex};
use crate::ledger::{Ledger, RecordFilter, Subscription};

/// Lifecycle of an [`Indexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexState {
    /// Not started, or the last start failed.
    Uninitialized,
    /// Initial replay in progress.
    Replaying,
    /// Following the live subscription.
    Live,
    /// Subscription lost; serving the last snapshot while reconnecting.
    Degraded,
    /// Shut down after a successful replay; serving the last snapshot.
    Stopped,
}

impl IndexState {
    /// Whether queries are answered in this state.
    pub fn is_serving(self) -> bool {
        matches!(
            self,
            IndexState::Live | IndexState::Degraded | IndexState::Stopped
        )
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexState::Uninitialized => "uninitialized",
            IndexState::Replaying => "replaying",
            IndexState::Live => "live",
            IndexState::Degraded => "degraded",
            IndexState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Configuration for indexer behavior.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Upper bound on a full replay or catch-up.
    pub replay_deadline: Duration,
    /// Upper bound on a single gap query.
    pub gap_query_deadline: Duration,
    /// Upper bound on opening a subscription.
    pub reconnect_deadline: Duration,
    /// Delay before the first reconnect attempt; doubles on each failure.
    pub reconnect_backoff: Duration,
    /// Ceiling for the reconnect delay.
    pub max_reconnect_backoff: Duration,
    /// Maximum ids covered by one range query.
    pub replay_batch_size: usize,
    /// Records buffered per observer. An observer whose buffer is full is
    /// dropped and its receiver closes.
    pub observer_capacity: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            replay_deadline: Duration::from_secs(30),
            gap_query_deadline: Duration::from_secs(10),
            reconnect_deadline: Duration::from_secs(10),
            reconnect_backoff: Duration::from_millis(250),
            max_reconnect_backoff: Duration::from_secs(30),
            replay_batch_size: 500,
            observer_capacity: 1024,
        }
    }
}

impl IndexerConfig {
    pub fn with_replay_deadline(mut self, deadline: Duration) -> Self {
        self.replay_deadline = deadline;
        self
    }

    pub fn with_gap_query_deadline(mut self, deadline: Duration) -> Self {
        self.gap_query_deadline = deadline;
        self
    }

    pub fn with_reconnect_deadline(mut self, deadline: Duration) -> Self {
        self.reconnect_deadline = deadline;
        self
    }

    pub fn with_reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_backoff = initial;
        self.max_reconnect_backoff = max.max(initial);
        self
    }

    pub fn with_replay_batch_size(mut self, size: usize) -> Self {
        self.replay_batch_size = size.max(1);
        self
    }

    pub fn with_observer_capacity(mut self, capacity: usize) -> Self {
        self.observer_capacity = capacity.max(1);
        self
    }

    fn batch_span(&self) -> u64 {
        self.replay_batch_size.max(1) as u64
    }
}

/// Summary of a replay or catch-up pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Records newly added to the index.
    pub records_indexed: usize,
    /// Range queries issued.
    pub batches: usize,
    /// Frontier when the pass finished.
    pub frontier: RecordId,
    pub elapsed: Duration,
}

/// Handle for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Receiving end of an observer registration.
pub type ObserverReceiver = mpsc::Receiver<Arc<NotarizationRecord>>;

type ObserverSender = mpsc::Sender<Arc<NotarizationRecord>>;

/// State shared between the indexer handle and its task.
struct Shared {
    index: RwLock<RecordIndex>,
    observers: Mutex<Vec<(ObserverId, ObserverSender)>>,
    next_observer: AtomicU64,
    state: watch::Sender<IndexState>,
}

impl Shared {
    fn read_index(&self) -> Result<RwLockReadGuard<'_, RecordIndex>> {
        self.index
            .read()
            .map_err(|e| LedgerError::Unavailable(format!("index lock poisoned: {e}")))
    }

    fn write_index(&self) -> Result<RwLockWriteGuard<'_, RecordIndex>> {
        self.index
            .write()
            .map_err(|e| LedgerError::Unavailable(format!("index lock poisoned: {e}")))
    }

    fn state(&self) -> IndexState {
        *self.state.borrow()
    }

    fn set_state(&self, state: IndexState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "index state changed");
        }
    }

    /// Push newly indexed records to every observer, dropping closed ones
    /// and ones that have fallen behind.
    fn notify(&self, records: &[Arc<NotarizationRecord>]) {
        if records.is_empty() {
            return;
        }
        match self.observers.lock() {
            Ok(mut observers) => {
                observers.retain(|(id, tx)| {
                    records.iter().all(|r| match tx.try_send(Arc::clone(r)) {
                        Ok(()) => true,
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!(observer = id.0, "observer buffer full, dropping it");
                            false
                        }
                        Err(TrySendError::Closed(_)) => false,
                    })
                });
            }
            Err(e) => tracing::warn!(error = %e, "observer list poisoned, skipping notification"),
        }
    }
}

/// A running indexer task and the means to stop it.
struct Running {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Maintains by-id and by-recipient views of the ledger.
///
/// Dropping the indexer without calling [`Indexer::shutdown`] still stops
/// the background task: it exits once its shutdown channel closes.
pub struct Indexer<L: Ledger + 'static> {
    ledger: Arc<L>,
    config: IndexerConfig,
    shared: Arc<Shared>,
    task: Mutex<Option<Running>>,
}

impl<L: Ledger + 'static> Indexer<L> {
    pub fn new(ledger: Arc<L>, config: IndexerConfig) -> Self {
        let (state, _) = watch::channel(IndexState::Uninitialized);
        Self {
            ledger,
            config,
            shared: Arc::new(Shared {
                index: RwLock::new(RecordIndex::new()),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(1),
                state,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Replay the ledger and start following it.
    ///
    /// Returns once the initial replay has finished. On failure the indexer
    /// is left `Uninitialized` with an empty index and may be started again.
    pub async fn start(&self) -> Result<ReplayReport> {
        let ready = {
            let mut task = self
                .task
                .lock()
                .map_err(|e| LedgerError::Unavailable(format!("task lock poisoned: {e}")))?;
            if task.is_some() || self.shared.state() != IndexState::Uninitialized {
                return Err(LedgerError::AlreadyStarted);
            }

            self.shared.set_state(IndexState::Replaying);
            let (ready_tx, ready_rx) = oneshot::channel();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let worker = Worker {
                ledger: Arc::clone(&self.ledger),
                shared: Arc::clone(&self.shared),
                config: self.config.clone(),
            };

            *task = Some(Running {
                handle: tokio::spawn(worker.run(ready_tx, shutdown_rx)),
                shutdown: shutdown_tx,
            });
            ready_rx
        };

        let result = ready
            .await
            .unwrap_or_else(|_| Err(LedgerError::Unavailable("indexer task ended during replay".into())));

        if result.is_err() {
            if let Ok(mut task) = self.task.lock() {
                task.take();
            }
        }
        result
    }

    /// Stop the background task.
    ///
    /// An indexer that completed its replay moves to `Stopped` and keeps
    /// serving the last snapshot. One that never did stays `Uninitialized`
    /// and its queries keep failing.
    pub async fn shutdown(&self) {
        let running = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(running) = running {
            let _ = running.shutdown.send(true);
            if let Err(e) = running.handle.await {
                tracing::warn!(error = %e, "indexer task did not exit cleanly");
            }
        }

        if self.shared.state().is_serving() {
            self.shared.set_state(IndexState::Stopped);
        } else {
            self.shared.set_state(IndexState::Uninitialized);
        }
    }

    pub fn state(&self) -> IndexState {
        self.shared.state()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<IndexState> {
        self.shared.state.subscribe()
    }

    /// Wait until the indexer reaches `target`, failing after `deadline`.
    pub async fn wait_for_state(&self, target: IndexState, deadline: Duration) -> Result<()> {
        let mut states = self.shared.state.subscribe();
        let reached = tokio::time::timeout(deadline, states.wait_for(|state| *state == target))
            .await
            .map_err(|_| LedgerError::deadline("waiting for index state"))?;
        reached
            .map(|_| ())
            .map_err(|_| LedgerError::Unavailable("indexer dropped".into()))
    }

    fn snapshot(&self) -> Result<RwLockReadGuard<'_, RecordIndex>> {
        let state = self.shared.state();
        if !state.is_serving() {
            return Err(LedgerError::Unavailable(format!("index is {state}")));
        }
        self.shared.read_index()
    }

    /// Look up a record by id.
    pub fn by_id(&self, id: RecordId) -> Result<Arc<NotarizationRecord>> {
        self.snapshot()?.by_id(id).ok_or(LedgerError::NotFound(id))
    }

    /// Records sent to `recipient`, most recent first.
    pub fn by_recipient(&self, recipient: &Address) -> Result<Vec<Arc<NotarizationRecord>>> {
        Ok(self.snapshot()?.by_recipient(recipient))
    }

    /// Every indexed record in ledger order.
    pub fn all(&self) -> Result<Vec<Arc<NotarizationRecord>>> {
        Ok(self.snapshot()?.all())
    }

    pub fn frontier(&self) -> Result<RecordId> {
        Ok(self.snapshot()?.frontier())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.snapshot()?.is_empty())
    }

    /// Receive every record indexed from now on, in fold order.
    pub fn register_observer(&self) -> Result<(ObserverId, ObserverReceiver)> {
        let id = ObserverId(self.shared.next_observer.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.observer_capacity.max(1));
        self.shared
            .observers
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("observer lock poisoned: {e}")))?
            .push((id, tx));
        Ok((id, rx))
    }

    /// Stop delivering to `id`. Returns whether it was registered.
    pub fn unregister_observer(&self, id: ObserverId) -> Result<bool> {
        let mut observers = self
            .shared
            .observers
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("observer lock poisoned: {e}")))?;
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        Ok(observers.len() != before)
    }

    /// Replay the ledger into a scratch index up to the current frontier and
    /// compare it with the live index.
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        let (local, frontier) = {
            let index = self.snapshot()?;
            (index.iter().cloned().collect::<Vec<_>>(), index.frontier())
        };

        within(
            self.config.replay_deadline,
            "consistency check",
            consistency::check_consistency(
                self.ledger.as_ref(),
                &local,
                frontier,
                self.config.batch_span(),
            ),
        )
        .await
    }
}

async fn within<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| LedgerError::deadline(what))?
}

/// Resolves once shutdown is requested or the indexer handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

enum Exit {
    Shutdown,
    Lost,
}

/// The task side of the indexer.
struct Worker<L> {
    ledger: Arc<L>,
    shared: Arc<Shared>,
    config: IndexerConfig,
}

impl<L: Ledger + 'static> Worker<L> {
    async fn run(
        self,
        ready: oneshot::Sender<Result<ReplayReport>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let subscription = match self.replay().await {
            Ok((subscription, report)) => {
                tracing::info!(
                    records = report.records_indexed,
                    batches = report.batches,
                    frontier = %report.frontier,
                    elapsed = ?report.elapsed,
                    "replay complete"
                );
                self.shared.set_state(IndexState::Live);
                let _ = ready.send(Ok(report));
                subscription
            }
            Err(e) => {
                tracing::warn!(error = %e, "replay failed");
                if let Ok(mut index) = self.shared.write_index() {
                    *index = RecordIndex::new();
                }
                self.shared.set_state(IndexState::Uninitialized);
                let _ = ready.send(Err(e));
                return;
            }
        };

        self.follow_until_shutdown(subscription, &mut shutdown).await;
        tracing::debug!("indexer task exiting");
    }

    /// Subscribe first so nothing appended during replay is missed, then
    /// fold history.
    async fn replay(&self) -> Result<(Subscription, ReplayReport)> {
        let subscription = self.subscribe().await?;
        let report = within(self.config.replay_deadline, "replay", self.catch_up()).await?;
        Ok((subscription, report))
    }

    async fn subscribe(&self) -> Result<Subscription> {
        within(
            self.config.reconnect_deadline,
            "subscribe",
            self.ledger.subscribe(RecordFilter::all()),
        )
        .await
    }

    /// Fold every ledger record above the frontier, in batches.
    async fn catch_up(&self) -> Result<ReplayReport> {
        let started = Instant::now();
        let mut report = ReplayReport::default();
        let latest = self.ledger.latest_id().await?;

        if let Some(latest) = latest {
            loop {
                let frontier = self.shared.read_index()?.frontier();
                if frontier >= latest {
                    break;
                }
                let from = frontier.next();
                let to = RecordId(
                    from.get()
                        .saturating_add(self.config.batch_span() - 1)
                        .min(latest.get()),
                );

                let records = self.ledger.query(from, to).await?;
                let indexed = self.shared.write_index()?.apply_range(records, to);
                tracing::debug!(%from, %to, indexed = indexed.len(), "folded batch");

                report.batches += 1;
                report.records_indexed += indexed.len();
                self.shared.notify(&indexed);
            }
        }

        report.frontier = self.shared.read_index()?.frontier();
        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Query the ranges that hold back pending live records.
    async fn fill_gaps(&self) -> Result<()> {
        loop {
            let Some((from, gap_end)) = self.shared.read_index()?.gap() else {
                return Ok(());
            };
            let to = RecordId(
                from.get()
                    .saturating_add(self.config.batch_span() - 1)
                    .min(gap_end.get()),
            );

            let records = within(
                self.config.gap_query_deadline,
                "gap query",
                self.ledger.query(from, to),
            )
            .await?;
            let indexed = self.shared.write_index()?.apply_range(records, to);
            tracing::debug!(%from, %to, indexed = indexed.len(), "filled gap");
            self.shared.notify(&indexed);
        }
    }

    async fn fold_live(&self, record: NotarizationRecord) -> Result<()> {
        let record_id = record.id;
        let outcome = self.shared.write_index()?.apply_live(record);

        match outcome {
            FoldOutcome::Indexed(indexed) => {
                tracing::debug!(%record_id, released = indexed.len() - 1, "indexed live record");
                self.shared.notify(&indexed);
                Ok(())
            }
            FoldOutcome::Duplicate => {
                tracing::debug!(%record_id, "dropped duplicate delivery");
                Ok(())
            }
            FoldOutcome::Deferred => self.fill_gaps().await,
        }
    }

    async fn follow_until_shutdown(
        &self,
        mut subscription: Subscription,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        loop {
            match self.follow(&mut subscription, shutdown).await {
                Exit::Shutdown => return,
                Exit::Lost => match self.recover(shutdown).await {
                    Some(restored) => subscription = restored,
                    None => return,
                },
            }
        }
    }

    async fn follow(
        &self,
        subscription: &mut Subscription,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Exit {
        loop {
            tokio::select! {
                _ = shutdown_requested(shutdown) => return Exit::Shutdown,
                next = subscription.next() => match next {
                    Some(record) => {
                        if let Err(e) = self.fold_live(record).await {
                            tracing::warn!(error = %e, "live fold failed");
                            return Exit::Lost;
                        }
                    }
                    None => {
                        tracing::warn!("ledger subscription lost");
                        return Exit::Lost;
                    }
                },
            }
        }
    }

    /// Resubscribe and catch up from the frontier, retrying with backoff
    /// until it works or shutdown is requested.
    async fn recover(&self, shutdown: &mut watch::Receiver<bool>) -> Option<Subscription> {
        self.shared.set_state(IndexState::Degraded);
        let mut backoff = self.config.reconnect_backoff;
        let mut attempt = 0u32;

        loop {
            tokio::select! {
                _ = shutdown_requested(shutdown) => return None,
                _ = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;

            match self.resume().await {
                Ok((subscription, report)) => {
                    tracing::info!(
                        attempt,
                        recovered = report.records_indexed,
                        frontier = %report.frontier,
                        "subscription restored"
                    );
                    self.shared.set_state(IndexState::Live);
                    return Some(subscription);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, ?backoff, "recovery attempt failed");
                    backoff = backoff
                        .saturating_mul(2)
                        .min(self.config.max_reconnect_backoff);
                }
            }
        }
    }

    async fn resume(&self) -> Result<(Subscription, ReplayReport)> {
        let (subscription, report) = self.replay().await?;
        self.fill_gaps().await?;
        Ok((subscription, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use notary_core::{hash, NewRecord};

    const WAIT: Duration = Duration::from_secs(5);

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn new_record(to: u8, body: &str) -> NewRecord {
        NewRecord::new(addr(0xaa), addr(to), hash(body.as_bytes()))
    }

    fn fast_config() -> IndexerConfig {
        IndexerConfig::default()
            .with_reconnect_backoff(Duration::from_millis(10), Duration::from_millis(50))
            .with_replay_batch_size(2)
    }

    async fn ledger_with(bodies: &[&str]) -> Arc<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new());
        for body in bodies {
            ledger.append(new_record(0xbb, body)).await.unwrap();
        }
        ledger
    }

    async fn next_id(observed: &mut ObserverReceiver) -> u64 {
        tokio::time::timeout(WAIT, observed.recv())
            .await
            .expect("observer timed out")
            .expect("observer closed")
            .id
            .get()
    }

    fn ids(records: &[Arc<NotarizationRecord>]) -> Vec<u64> {
        records.iter().map(|r| r.id.get()).collect()
    }

    #[tokio::test]
    async fn test_replay_then_overlapping_live_indexes_each_once() {
        init_tracing();
        let ledger = ledger_with(&["1", "2", "3"]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        let (_, mut observed) = indexer.register_observer().unwrap();

        let report = indexer.start().await.unwrap();
        assert_eq!(report.records_indexed, 3);
        assert_eq!(report.batches, 2);
        assert_eq!(report.frontier, RecordId(3));
        assert_eq!(indexer.state(), IndexState::Live);
        for expected in 1..=3 {
            assert_eq!(next_id(&mut observed).await, expected);
        }

        ledger.redeliver(RecordId(2), RecordId(3)).unwrap();
        ledger.append(new_record(0xbb, "4")).await.unwrap();
        assert_eq!(next_id(&mut observed).await, 4);

        assert_eq!(ids(&indexer.all().unwrap()), [1, 2, 3, 4]);
        assert_eq!(indexer.by_id(RecordId(4)).unwrap().content_id, hash(b"4"));
    }

    #[tokio::test]
    async fn test_queries_fail_before_start() {
        let ledger = ledger_with(&["1"]).await;
        let indexer = Indexer::new(ledger, fast_config());

        assert_eq!(indexer.state(), IndexState::Uninitialized);
        assert!(matches!(
            indexer.by_id(RecordId(1)),
            Err(LedgerError::Unavailable(_))
        ));
        assert!(matches!(indexer.all(), Err(LedgerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_start_fails_when_ledger_unreachable() {
        init_tracing();
        let ledger = ledger_with(&["1"]).await;
        ledger.set_available(false).unwrap();
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());

        let err = indexer.start().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(indexer.state(), IndexState::Uninitialized);
        assert!(matches!(
            indexer.by_recipient(&addr(0xbb)),
            Err(LedgerError::Unavailable(_))
        ));

        ledger.set_available(true).unwrap();
        indexer.start().await.unwrap();
        assert_eq!(indexer.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replay_deadline_expires() {
        let ledger = ledger_with(&["1"]).await;
        ledger.set_latency(Duration::from_millis(200)).unwrap();
        let config = fast_config().with_replay_deadline(Duration::from_millis(50));
        let indexer = Indexer::new(ledger, config);

        match indexer.start().await {
            Err(LedgerError::Unavailable(msg)) => assert!(msg.contains("deadline")),
            other => panic!("expected deadline expiry, got {other:?}"),
        }
        assert_eq!(indexer.state(), IndexState::Uninitialized);
    }

    #[tokio::test]
    async fn test_order_follows_ids_not_timestamps() {
        let ledger = Arc::new(MemoryLedger::new());
        for (clock, to) in [(300, 0xbb), (100, 0xbb), (200, 0xcc), (50, 0xbb)] {
            ledger.set_clock(Some(clock)).unwrap();
            ledger
                .append(new_record(to, &format!("{clock}")))
                .await
                .unwrap();
        }

        let indexer = Indexer::new(ledger, fast_config());
        indexer.start().await.unwrap();

        assert_eq!(ids(&indexer.all().unwrap()), [1, 2, 3, 4]);
        let inbox = indexer.by_recipient(&addr(0xbb)).unwrap();
        assert_eq!(ids(&inbox), [4, 2, 1]);
        assert!(inbox.iter().all(|r| r.recipient == addr(0xbb)));
    }

    #[tokio::test]
    async fn test_missed_live_record_is_filled_from_gap_query() {
        let ledger = ledger_with(&["1", "2"]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        indexer.start().await.unwrap();
        let (_, mut observed) = indexer.register_observer().unwrap();

        ledger.inject(new_record(0xbb, "3")).unwrap();
        ledger.append(new_record(0xbb, "4")).await.unwrap();

        assert_eq!(next_id(&mut observed).await, 3);
        assert_eq!(next_id(&mut observed).await, 4);
        assert_eq!(indexer.frontier().unwrap(), RecordId(4));
    }

    #[tokio::test]
    async fn test_sparse_ids_are_indexed() {
        let ledger = Arc::new(MemoryLedger::new().with_id_step(5));
        for body in ["a", "b", "c"] {
            ledger.append(new_record(0xbb, body)).await.unwrap();
        }
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        indexer.start().await.unwrap();
        let (_, mut observed) = indexer.register_observer().unwrap();

        let id = ledger.append(new_record(0xbb, "d")).await.unwrap();
        assert_eq!(id, RecordId(16));
        assert_eq!(next_id(&mut observed).await, 16);
        assert_eq!(ids(&indexer.all().unwrap()), [1, 6, 11, 16]);
    }

    #[tokio::test]
    async fn test_degraded_catch_up_after_subscription_loss() {
        init_tracing();
        let ledger = ledger_with(&["1"]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        indexer.start().await.unwrap();
        let (_, mut observed) = indexer.register_observer().unwrap();

        ledger.set_available(false).unwrap();
        indexer
            .wait_for_state(IndexState::Degraded, WAIT)
            .await
            .unwrap();

        // The last snapshot keeps serving.
        assert_eq!(indexer.by_id(RecordId(1)).unwrap().id, RecordId(1));

        ledger.inject(new_record(0xbb, "2")).unwrap();
        ledger.inject(new_record(0xcc, "3")).unwrap();
        ledger.set_available(true).unwrap();

        assert_eq!(next_id(&mut observed).await, 2);
        assert_eq!(next_id(&mut observed).await, 3);
        indexer.wait_for_state(IndexState::Live, WAIT).await.unwrap();

        ledger.append(new_record(0xbb, "4")).await.unwrap();
        assert_eq!(next_id(&mut observed).await, 4);
        assert_eq!(ids(&indexer.all().unwrap()), [1, 2, 3, 4]);

        let report = indexer.check_consistency().await.unwrap();
        assert!(matches!(
            report,
            ConsistencyReport::Consistent {
                frontier: RecordId(4),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_observers_can_unregister() {
        let ledger = ledger_with(&[]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        indexer.start().await.unwrap();

        let (first, mut first_rx) = indexer.register_observer().unwrap();
        let (_, mut second_rx) = indexer.register_observer().unwrap();
        assert!(indexer.unregister_observer(first).unwrap());
        assert!(!indexer.unregister_observer(first).unwrap());

        ledger.append(new_record(0xbb, "1")).await.unwrap();
        assert_eq!(next_id(&mut second_rx).await, 1);
        assert!(first_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_keeps_snapshot_and_blocks_restart() {
        let ledger = ledger_with(&["1", "2"]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        indexer.start().await.unwrap();
        assert!(matches!(indexer.start().await, Err(LedgerError::AlreadyStarted)));

        indexer.shutdown().await;
        assert_eq!(indexer.state(), IndexState::Stopped);
        assert_eq!(indexer.len().unwrap(), 2);
        assert!(matches!(indexer.start().await, Err(LedgerError::AlreadyStarted)));
        assert_eq!(ledger.subscriber_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_replay_stays_unavailable() {
        let indexer = Indexer::new(Arc::new(MemoryLedger::new()), fast_config());
        indexer.shutdown().await;
        assert_eq!(indexer.state(), IndexState::Uninitialized);
        assert!(indexer.all().unwrap_err().is_retryable());
        assert!(indexer.by_recipient(&addr(0xbb)).unwrap_err().is_retryable());

        let ledger = ledger_with(&["1"]).await;
        ledger.set_available(false).unwrap();
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config());
        assert!(indexer.start().await.is_err());
        indexer.shutdown().await;
        assert_eq!(indexer.state(), IndexState::Uninitialized);
        assert!(matches!(indexer.all(), Err(LedgerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_dropped_subscription_recovers_while_online() {
        let ledger = ledger_with(&["1"]).await;
        let config = fast_config()
            .with_reconnect_backoff(Duration::from_millis(300), Duration::from_millis(300));
        let indexer = Indexer::new(Arc::clone(&ledger), config);
        indexer.start().await.unwrap();
        let mut states = indexer.watch_state();
        let (_, mut observed) = indexer.register_observer().unwrap();

        ledger.disconnect_subscribers().unwrap();
        tokio::time::timeout(WAIT, states.wait_for(|s| *s == IndexState::Degraded))
            .await
            .unwrap()
            .unwrap();

        // Appended while nobody is subscribed; only catch-up can find it.
        ledger.append(new_record(0xbb, "2")).await.unwrap();
        assert_eq!(next_id(&mut observed).await, 2);
        tokio::time::timeout(WAIT, states.wait_for(|s| *s == IndexState::Live))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ledger.subscriber_count().unwrap(), 1);
        assert_eq!(ids(&indexer.all().unwrap()), [1, 2]);
    }

    #[tokio::test]
    async fn test_lagging_observer_is_dropped() {
        let ledger = ledger_with(&[]).await;
        let indexer = Indexer::new(Arc::clone(&ledger), fast_config().with_observer_capacity(2));
        indexer.start().await.unwrap();
        let (_, mut slow) = indexer.register_observer().unwrap();

        for body in ["1", "2", "3"] {
            ledger.append(new_record(0xbb, body)).await.unwrap();
        }

        assert_eq!(next_id(&mut slow).await, 1);
        assert_eq!(next_id(&mut slow).await, 2);
        let closed = tokio::time::timeout(WAIT, slow.recv()).await.unwrap();
        assert!(closed.is_none());
        assert_eq!(ids(&indexer.all().unwrap()), [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_wait_for_state_times_out() {
        let indexer = Indexer::new(Arc::new(MemoryLedger::new()), fast_config());
        let err = indexer
            .wait_for_state(IndexState::Live, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let ledger = ledger_with(&["1"]).await;
        let indexer = Indexer::new(ledger, fast_config());
        indexer.start().await.unwrap();

        assert_eq!(
            indexer.by_id(RecordId(99)).unwrap_err(),
            LedgerError::NotFound(RecordId(99))
        );
    }
}
