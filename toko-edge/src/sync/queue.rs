//! Offline operation queue
//!
//! Mutations made while the device is offline are appended here and replayed
//! against the [`RemoteBackend`] in enqueue order once connectivity returns.
//!
//! Per-item lifecycle:
//!
//! ```text
//! Pending ──drain──▶ InFlight ──ok──▶ Applied (removed)
//!    ▲                  │
//!    └──── err, retry_count < max ────┘
//!                       └── err, retry_count >= max ──▶ Discarded (removed, reported)
//! ```
//!
//! The item list sits behind a `parking_lot::Mutex` that is only taken in
//! synchronous sections. Only one drain runs at a time.

use parking_lot::Mutex;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{SyncOperation, SyncQueueItem};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::connectivity::Connectivity;
use super::error::{SyncError, SyncResult};
use super::remote::RemoteBackend;
use super::storage::QueueStore;
use crate::utils::clock::Clock;

/// Failed replays before an item is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    Pending,
    InFlight,
    Applied,
    Discarded,
}

impl ReplayState {
    /// State after a replay attempt; `retry_count` already includes a failure
    pub fn after_attempt(succeeded: bool, retry_count: u32, max_retries: u32) -> Self {
        if succeeded {
            ReplayState::Applied
        } else if retry_count >= max_retries {
            ReplayState::Discarded
        } else {
            ReplayState::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReplayState::Applied | ReplayState::Discarded)
    }
}

struct QueueEntry {
    item: SyncQueueItem,
    state: ReplayState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnqueueReceipt {
    pub id: String,
    /// Queue length after the enqueue
    pub pending: usize,
    /// False when writing to the durable store failed; the item is still
    /// queued in memory
    pub persisted: bool,
}

/// An item dropped after exhausting its retries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscardedItem {
    pub id: String,
    pub operation: SyncOperation,
    pub collection: String,
    pub retry_count: u32,
    pub last_error: String,
}

impl From<&DiscardedItem> for AppError {
    fn from(item: &DiscardedItem) -> Self {
        AppError::with_message(
            ErrorCode::SyncItemDiscarded,
            format!(
                "{} {} discarded after {} attempts: {}",
                item.collection, item.id, item.retry_count, item.last_error
            ),
        )
        .with_detail("id", item.id.clone())
        .with_detail("collection", item.collection.clone())
        .with_detail("retry_count", item.retry_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrainReport {
    pub applied: usize,
    pub retried: usize,
    pub discarded: Vec<DiscardedItem>,
    /// Queue length when the pass ended
    pub pending: usize,
    /// Connectivity dropped before every item was attempted
    pub interrupted: bool,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.pending == 0 && self.discarded.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    AlreadyDraining,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DrainOutcome {
    Skipped { reason: SkipReason },
    Completed(DrainReport),
}

/// Indicator state for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub online: bool,
    pub pending: usize,
    pub draining: bool,
}

/// Outcome of settling one attempted item
enum Settled {
    Applied,
    Retried,
    Discarded(DiscardedItem),
    /// Removed from the queue while in flight (e.g. `clear`)
    Gone,
}

pub struct SyncQueue {
    entries: Mutex<Vec<QueueEntry>>,
    store: Arc<dyn QueueStore>,
    remote: Arc<dyn RemoteBackend>,
    connectivity: Connectivity,
    clock: Arc<dyn Clock>,
    draining: AtomicBool,
    max_retries: u32,
}

/// Holds the single-flight flag for one drain pass.
///
/// On drop, anything still `InFlight` goes back to `Pending`, so a cancelled
/// drain leaves the queue replayable.
struct DrainGuard<'a> {
    queue: &'a SyncQueue,
}

impl<'a> DrainGuard<'a> {
    fn acquire(queue: &'a SyncQueue) -> Option<Self> {
        queue
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { queue })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        for entry in self.queue.entries.lock().iter_mut() {
            if entry.state == ReplayState::InFlight {
                entry.state = ReplayState::Pending;
            }
        }
        self.queue.draining.store(false, Ordering::Release);
    }
}

impl SyncQueue {
    /// Restore the queue from `store`
    pub fn new(
        store: Arc<dyn QueueStore>,
        remote: Arc<dyn RemoteBackend>,
        connectivity: Connectivity,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        let items = store.load()?;
        if !items.is_empty() {
            tracing::info!(pending = items.len(), "Sync queue restored");
        }

        Ok(Self {
            entries: Mutex::new(
                items
                    .into_iter()
                    .map(|item| QueueEntry {
                        item,
                        state: ReplayState::Pending,
                    })
                    .collect(),
            ),
            store,
            remote,
            connectivity,
            clock,
            draining: AtomicBool::new(false),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn remote(&self) -> &Arc<dyn RemoteBackend> {
        &self.remote
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Queue a mutation for later replay
    pub fn enqueue(
        &self,
        operation: SyncOperation,
        collection: impl Into<String>,
        payload: serde_json::Value,
    ) -> EnqueueReceipt {
        let item = SyncQueueItem {
            id: Uuid::new_v4().to_string(),
            operation,
            collection: collection.into(),
            payload,
            enqueued_at: self.clock.now_millis(),
            retry_count: 0,
        };
        let id = item.id.clone();

        let mut entries = self.entries.lock();
        tracing::debug!(
            id = %id,
            collection = %item.collection,
            operation = ?item.operation,
            "Operation queued for sync"
        );
        entries.push(QueueEntry {
            item,
            state: ReplayState::Pending,
        });
        let persisted = self.persist(&entries);

        EnqueueReceipt {
            id,
            pending: entries.len(),
            persisted,
        }
    }

    /// Replay every pending item once.
    ///
    /// Skipped when offline or when another drain is running. Items enqueued
    /// after the pass starts wait for the next pass.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.connectivity.is_online() {
            return DrainOutcome::Skipped {
                reason: SkipReason::Offline,
            };
        }
        let Some(_guard) = DrainGuard::acquire(self) else {
            return DrainOutcome::Skipped {
                reason: SkipReason::AlreadyDraining,
            };
        };

        let batch = self.start_batch();
        let mut report = DrainReport::default();
        if !batch.is_empty() {
            tracing::info!("Syncing {} pending operations", batch.len());
        }

        for item in &batch {
            if !self.connectivity.is_online() {
                tracing::warn!("Connection lost during sync, stopping drain");
                report.interrupted = true;
                break;
            }

            let result = self.remote.replay(item).await;
            match self.settle(&item.id, result) {
                Settled::Applied => report.applied += 1,
                Settled::Retried => report.retried += 1,
                Settled::Discarded(discarded) => report.discarded.push(discarded),
                Settled::Gone => {}
            }
        }

        report.pending = self.pending_count();
        if !batch.is_empty() {
            if report.is_clean() {
                tracing::info!(applied = report.applied, "All queued operations synced");
            } else {
                tracing::warn!(
                    applied = report.applied,
                    retried = report.retried,
                    discarded = report.discarded.len(),
                    pending = report.pending,
                    "Sync pass finished with failures"
                );
            }
        }
        DrainOutcome::Completed(report)
    }

    /// User-triggered drain with distinct errors for "offline" and "empty"
    pub async fn manual_drain(&self) -> SyncResult<DrainReport> {
        if !self.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        if self.pending_count() == 0 {
            return Err(SyncError::NothingToDrain);
        }

        match self.drain().await {
            DrainOutcome::Completed(report) => Ok(report),
            DrainOutcome::Skipped {
                reason: SkipReason::Offline,
            } => Err(SyncError::Offline),
            DrainOutcome::Skipped {
                reason: SkipReason::AlreadyDraining,
            } => Err(SyncError::AlreadyDraining),
        }
    }

    /// Drop every queued operation; returns how many were removed
    pub fn clear(&self) -> SyncResult<usize> {
        let mut entries = self.entries.lock();
        // Same ordering rule as `persist`
        self.store.save(&[])?;
        let removed = entries.len();
        entries.clear();
        tracing::warn!(removed, "Sync queue cleared");
        Ok(removed)
    }

    /// Snapshot of queued items in enqueue order
    pub fn pending(&self) -> Vec<SyncQueueItem> {
        self.entries.lock().iter().map(|e| e.item.clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            online: self.is_online(),
            pending: self.pending_count(),
            draining: self.is_draining(),
        }
    }

    /// Mark every pending item in flight and return copies to replay
    fn start_batch(&self) -> Vec<SyncQueueItem> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .filter(|e| e.state == ReplayState::Pending)
            .map(|e| {
                e.state = ReplayState::InFlight;
                e.item.clone()
            })
            .collect()
    }

    fn settle(&self, id: &str, result: SyncResult<()>) -> Settled {
        let mut entries = self.entries.lock();
        let Some(position) = entries.iter().position(|e| e.item.id == id) else {
            return Settled::Gone;
        };

        let entry = &mut entries[position];
        if result.is_err() {
            entry.item.retry_count += 1;
        }
        let next = ReplayState::after_attempt(result.is_ok(), entry.item.retry_count, self.max_retries);

        let settled = match (next, result) {
            (ReplayState::Applied, _) => {
                tracing::debug!(id = %id, "Synced operation");
                Settled::Applied
            }
            (ReplayState::Discarded, Err(e)) => {
                tracing::warn!(
                    id = %id,
                    collection = %entry.item.collection,
                    attempts = entry.item.retry_count,
                    "Operation failed after {} retries, discarding: {e}",
                    self.max_retries
                );
                Settled::Discarded(DiscardedItem {
                    id: entry.item.id.clone(),
                    operation: entry.item.operation,
                    collection: entry.item.collection.clone(),
                    retry_count: entry.item.retry_count,
                    last_error: e.to_string(),
                })
            }
            (_, Err(e)) => {
                tracing::warn!(
                    id = %id,
                    attempt = entry.item.retry_count,
                    max_retries = self.max_retries,
                    "Failed to sync operation: {e}"
                );
                Settled::Retried
            }
            // Pending/InFlight never follow a success
            (_, Ok(())) => Settled::Applied,
        };

        entry.state = next;
        if next.is_terminal() {
            entries.remove(position);
        }
        self.persist(&entries);
        settled
    }

    /// Write the whole queue through the store.
    ///
    /// Called with the entries lock held, so snapshots reach the store in the
    /// same order as the in-memory changes. The store write is synchronous
    /// (one redb commit) and no `.await` happens under the lock; a drain only
    /// takes it between replays, never across one.
    fn persist(&self, entries: &[QueueEntry]) -> bool {
        let items: Vec<SyncQueueItem> = entries.iter().map(|e| e.item.clone()).collect();
        match self.store.save(&items) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(pending = items.len(), "Failed to persist sync queue: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::storage::{MemoryQueueStore, RedbQueueStore};
    use crate::utils::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{Notify, Semaphore};

    /// Fails each listed collection a fixed number of times, then succeeds
    #[derive(Default)]
    struct ScriptedRemote {
        failures: Mutex<HashMap<String, u32>>,
        replayed: Mutex<Vec<String>>,
    }

    impl ScriptedRemote {
        fn failing(collection: &str, times: u32) -> Self {
            let remote = Self::default();
            remote.failures.lock().insert(collection.to_string(), times);
            remote
        }
    }

    #[async_trait]
    impl RemoteBackend for ScriptedRemote {
        async fn replay(&self, item: &SyncQueueItem) -> SyncResult<()> {
            let mut failures = self.failures.lock();
            if let Some(left) = failures.get_mut(&item.collection)
                && *left > 0
            {
                *left -= 1;
                return Err(SyncError::Replay("503 Service Unavailable".to_string()));
            }
            self.replayed.lock().push(item.collection.clone());
            Ok(())
        }
    }

    /// Blocks every replay until released
    struct GatedRemote {
        started: Notify,
        release: Semaphore,
        calls: AtomicUsize,
    }

    impl GatedRemote {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                release: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteBackend for GatedRemote {
        async fn replay(&self, _item: &SyncQueueItem) -> SyncResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            let permit = self
                .release
                .acquire()
                .await
                .map_err(|e| SyncError::Replay(e.to_string()))?;
            permit.forget();
            Ok(())
        }
    }

    fn queue_with(
        store: Arc<dyn QueueStore>,
        remote: Arc<dyn RemoteBackend>,
        online: bool,
    ) -> SyncQueue {
        SyncQueue::new(
            store,
            remote,
            Connectivity::new(online),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        )
        .unwrap()
    }

    fn completed(outcome: DrainOutcome) -> DrainReport {
        match outcome {
            DrainOutcome::Completed(report) => report,
            other => panic!("expected completed drain, got {other:?}"),
        }
    }

    #[test]
    fn test_after_attempt() {
        assert_eq!(ReplayState::after_attempt(true, 2, 3), ReplayState::Applied);
        assert_eq!(ReplayState::after_attempt(false, 2, 3), ReplayState::Pending);
        assert_eq!(ReplayState::after_attempt(false, 3, 3), ReplayState::Discarded);
    }

    #[test]
    fn test_enqueue_persists_immediately() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = queue_with(store.clone(), Arc::new(ScriptedRemote::default()), false);

        let receipt = queue.enqueue(
            SyncOperation::Create,
            "transactions",
            serde_json::json!({ "total": 27000 }),
        );

        assert!(receipt.persisted);
        assert_eq!(receipt.pending, 1);
        let stored = store.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, receipt.id);
        assert_eq!(stored[0].enqueued_at, 1_700_000_000_000);
        assert_eq!(stored[0].retry_count, 0);
    }

    #[test]
    fn test_concurrent_enqueues_keep_store_in_queue_order() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = queue_with(store.clone(), Arc::new(ScriptedRemote::default()), false);

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let queue = &queue;
                scope.spawn(move || {
                    for n in 0..50 {
                        queue.enqueue(
                            SyncOperation::Create,
                            "transactions",
                            serde_json::json!({ "worker": worker, "n": n }),
                        );
                    }
                });
            }
        });

        let stored: Vec<String> = store.snapshot().into_iter().map(|i| i.id).collect();
        let in_memory: Vec<String> = queue.pending().into_iter().map(|i| i.id).collect();
        assert_eq!(stored.len(), 200);
        assert_eq!(stored, in_memory);
    }

    #[test]
    fn test_enqueue_survives_persist_failure() {
        let store = Arc::new(MemoryQueueStore::new());
        store.set_fail_saves(true);
        let queue = queue_with(store.clone(), Arc::new(ScriptedRemote::default()), false);

        let receipt = queue.enqueue(SyncOperation::Update, "products", serde_json::json!({}));

        assert!(!receipt.persisted);
        assert_eq!(queue.pending_count(), 1);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_drain_offline_is_noop() {
        let remote = Arc::new(ScriptedRemote::default());
        let queue = queue_with(Arc::new(MemoryQueueStore::new()), remote.clone(), false);
        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({}));

        assert_eq!(
            queue.drain().await,
            DrainOutcome::Skipped {
                reason: SkipReason::Offline
            }
        );
        assert_eq!(queue.pending_count(), 1);
        assert!(remote.replayed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_retried_until_applied() {
        let store = Arc::new(MemoryQueueStore::new());
        let remote = Arc::new(ScriptedRemote::failing("debts", 2));
        let queue = queue_with(store.clone(), remote.clone(), true);

        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({}));
        queue.enqueue(SyncOperation::Create, "debts", serde_json::json!({}));
        queue.enqueue(SyncOperation::Update, "products", serde_json::json!({}));

        let first = completed(queue.drain().await);
        assert_eq!((first.applied, first.retried, first.pending), (2, 1, 1));
        assert_eq!(store.snapshot()[0].retry_count, 1);

        let second = completed(queue.drain().await);
        assert_eq!((second.applied, second.retried, second.pending), (0, 1, 1));
        assert_eq!(store.snapshot()[0].retry_count, 2);

        let third = completed(queue.drain().await);
        assert_eq!((third.applied, third.pending), (1, 0));
        assert!(third.discarded.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(
            *remote.replayed.lock(),
            vec!["transactions", "products", "debts"]
        );
    }

    #[tokio::test]
    async fn test_item_discarded_after_max_retries() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = queue_with(
            store.clone(),
            Arc::new(ScriptedRemote::failing("debts", u32::MAX)),
            true,
        );
        let receipt = queue.enqueue(SyncOperation::Create, "debts", serde_json::json!({}));

        completed(queue.drain().await);
        completed(queue.drain().await);
        let last = completed(queue.drain().await);

        assert_eq!(last.discarded.len(), 1);
        assert_eq!(last.discarded[0].id, receipt.id);
        assert_eq!(last.discarded[0].retry_count, DEFAULT_MAX_RETRIES);
        assert!(last.discarded[0].last_error.contains("503"));
        assert_eq!(last.pending, 0);
        assert!(store.snapshot().is_empty());

        let err = AppError::from(&last.discarded[0]);
        assert_eq!(err.code, ErrorCode::SyncItemDiscarded);
        assert_eq!(err.detail("collection"), Some(&serde_json::json!("debts")));
        assert_eq!(
            err.detail("retry_count"),
            Some(&serde_json::json!(DEFAULT_MAX_RETRIES))
        );
    }

    #[tokio::test]
    async fn test_single_flight_and_mid_drain_enqueue() {
        let remote = Arc::new(GatedRemote::new());
        let queue = Arc::new(queue_with(
            Arc::new(MemoryQueueStore::new()),
            remote.clone(),
            true,
        ));
        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 1 }));

        let running = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await }
        });
        remote.started.notified().await;

        assert_eq!(
            queue.drain().await,
            DrainOutcome::Skipped {
                reason: SkipReason::AlreadyDraining
            }
        );
        let late = queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 2 }));

        remote.release.add_permits(1);
        let report = completed(running.await.unwrap());

        assert_eq!(report.applied, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        let left = queue.pending();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, late.id);
        assert_eq!(left[0].retry_count, 0);
        assert!(!queue.is_draining());
    }

    #[tokio::test]
    async fn test_cancelled_drain_returns_items_to_pending() {
        let remote = Arc::new(GatedRemote::new());
        let queue = Arc::new(queue_with(
            Arc::new(MemoryQueueStore::new()),
            remote.clone(),
            true,
        ));
        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({}));

        let running = tokio::spawn({
            let queue = queue.clone();
            async move { queue.drain().await }
        });
        remote.started.notified().await;
        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());

        assert!(!queue.is_draining());
        remote.release.add_permits(1);
        let report = completed(queue.drain().await);
        assert_eq!(report.applied, 1);
        assert_eq!(report.pending, 0);
    }

    #[tokio::test]
    async fn test_manual_drain_reports_offline_and_empty_distinctly() {
        let queue = queue_with(
            Arc::new(MemoryQueueStore::new()),
            Arc::new(ScriptedRemote::default()),
            false,
        );
        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({}));
        assert!(matches!(queue.manual_drain().await, Err(SyncError::Offline)));

        queue.connectivity().set_online(true);
        let report = queue.manual_drain().await.unwrap();
        assert_eq!(report.applied, 1);

        assert!(matches!(
            queue.manual_drain().await,
            Err(SyncError::NothingToDrain)
        ));
    }

    #[test]
    fn test_clear_empties_store() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = queue_with(store.clone(), Arc::new(ScriptedRemote::default()), false);
        queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({}));
        queue.enqueue(SyncOperation::Delete, "expenses", serde_json::json!({}));

        assert_eq!(queue.clear().unwrap(), 2);
        assert_eq!(queue.pending_count(), 0);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_restores_from_redb() {
        let store = Arc::new(RedbQueueStore::open_in_memory().unwrap());
        let first = queue_with(store.clone(), Arc::new(ScriptedRemote::default()), false);
        first.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 1 }));
        first.enqueue(SyncOperation::Create, "debts", serde_json::json!({ "n": 2 }));
        drop(first);

        let second = queue_with(store, Arc::new(ScriptedRemote::default()), false);
        let collections: Vec<String> = second.pending().into_iter().map(|i| i.collection).collect();
        assert_eq!(collections, vec!["transactions", "debts"]);
        assert_eq!(second.status().pending, 2);
    }
}
