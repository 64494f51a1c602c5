use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{SyncOperation, SyncQueueItem};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toko_edge::sync::{
    Connectivity, DrainOutcome, DrainReport, MemoryQueueStore, QueueStore, RedbQueueStore,
    RemoteBackend, SyncError, SyncQueue, SyncResult, SyncWorker,
};
use toko_edge::utils::clock::ManualClock;

/// Fails the item whose payload has `"n": flaky_n` a fixed number of times
struct FlakyRemote {
    flaky_n: i64,
    failures_left: AtomicU32,
    applied: Mutex<Vec<i64>>,
}

impl FlakyRemote {
    fn new(flaky_n: i64, failures: u32) -> Self {
        Self {
            flaky_n,
            failures_left: AtomicU32::new(failures),
            applied: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RemoteBackend for FlakyRemote {
    async fn replay(&self, item: &SyncQueueItem) -> SyncResult<()> {
        let n = item.payload["n"].as_i64().unwrap_or_default();
        if n == self.flaky_n
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
        {
            return Err(SyncError::Replay("connection reset".to_string()));
        }
        self.applied.lock().push(n);
        Ok(())
    }
}

#[derive(Default)]
struct CountingRemote {
    calls: AtomicUsize,
}

#[async_trait]
impl RemoteBackend for CountingRemote {
    async fn replay(&self, _item: &SyncQueueItem) -> SyncResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(1_735_689_600_000))
}

fn completed(outcome: DrainOutcome) -> DrainReport {
    match outcome {
        DrainOutcome::Completed(report) => report,
        other => panic!("expected completed drain, got {other:?}"),
    }
}

#[tokio::test]
async fn queue_survives_restart_and_drains_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync_queue.redb");

    {
        let store = Arc::new(RedbQueueStore::open(&path).unwrap());
        let queue = SyncQueue::new(
            store,
            Arc::new(CountingRemote::default()),
            Connectivity::new(false),
            clock(),
        )
        .unwrap();
        for n in 1..=3 {
            let receipt = queue.enqueue(
                SyncOperation::Create,
                "transactions",
                serde_json::json!({ "n": n }),
            );
            assert!(receipt.persisted);
        }
    }

    let store = Arc::new(RedbQueueStore::open(&path).unwrap());
    let remote = Arc::new(FlakyRemote::new(2, 2));
    let queue = SyncQueue::new(store.clone(), remote.clone(), Connectivity::new(true), clock())
        .unwrap();
    assert_eq!(queue.pending_count(), 3);

    let first = completed(queue.drain().await);
    assert_eq!((first.applied, first.retried, first.pending), (2, 1, 1));
    let stored = store.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].payload["n"], 2);
    assert_eq!(stored[0].retry_count, 1);

    let second = completed(queue.drain().await);
    assert_eq!((second.retried, second.pending), (1, 1));

    let third = completed(queue.drain().await);
    assert_eq!((third.applied, third.pending), (1, 0));
    assert!(third.discarded.is_empty());

    assert!(store.load().unwrap().is_empty());
    assert_eq!(*remote.applied.lock(), vec![1, 3, 2]);
}

#[tokio::test]
async fn persistently_failing_item_is_discarded_and_reported() {
    let store = Arc::new(MemoryQueueStore::new());
    let queue = SyncQueue::new(
        store.clone(),
        Arc::new(FlakyRemote::new(1, u32::MAX)),
        Connectivity::new(true),
        clock(),
    )
    .unwrap();
    let doomed = queue.enqueue(SyncOperation::Create, "debts", serde_json::json!({ "n": 1 }));
    queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 2 }));

    let first = completed(queue.drain().await);
    assert_eq!((first.applied, first.pending), (1, 1));
    completed(queue.drain().await);
    let last = completed(queue.drain().await);

    assert_eq!(last.discarded.len(), 1);
    assert_eq!(last.discarded[0].id, doomed.id);
    assert_eq!(last.discarded[0].collection, "debts");
    assert_eq!(last.pending, 0);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn manual_drain_distinguishes_offline_from_empty() {
    let queue = SyncQueue::new(
        Arc::new(MemoryQueueStore::new()),
        Arc::new(CountingRemote::default()),
        Connectivity::new(false),
        clock(),
    )
    .unwrap();

    queue.enqueue(SyncOperation::Update, "products", serde_json::json!({ "n": 1 }));
    let offline: toko_edge::AppError = queue.manual_drain().await.unwrap_err().into();
    assert_eq!(offline.code, toko_edge::ErrorCode::SyncOffline);

    queue.connectivity().set_online(true);
    assert_eq!(queue.manual_drain().await.unwrap().applied, 1);

    let empty: toko_edge::AppError = queue.manual_drain().await.unwrap_err().into();
    assert_eq!(empty.code, toko_edge::ErrorCode::SyncNothingPending);
}

#[tokio::test(start_paused = true)]
async fn reconnect_drains_after_settle_delay() {
    let remote = Arc::new(CountingRemote::default());
    let queue = Arc::new(
        SyncQueue::new(
            Arc::new(MemoryQueueStore::new()),
            remote.clone(),
            Connectivity::new(false),
            clock(),
        )
        .unwrap(),
    );
    queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 1 }));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(SyncWorker::new(queue.clone(), shutdown.clone()).run());
    tokio::time::sleep(Duration::from_millis(10)).await;

    queue.connectivity().set_online(true);
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.pending_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    assert_eq!(queue.pending_count(), 0);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropping_offline_before_settle_cancels_drain() {
    let remote = Arc::new(CountingRemote::default());
    let queue = Arc::new(
        SyncQueue::new(
            Arc::new(MemoryQueueStore::new()),
            remote.clone(),
            Connectivity::new(false),
            clock(),
        )
        .unwrap(),
    );
    queue.enqueue(SyncOperation::Create, "transactions", serde_json::json!({ "n": 1 }));

    let shutdown = CancellationToken::new();
    let worker = SyncWorker::new(queue.clone(), shutdown.clone())
        .with_retry_interval(Duration::from_secs(3600));
    let handle = tokio::spawn(worker.run());
    tokio::time::sleep(Duration::from_millis(10)).await;

    queue.connectivity().set_online(true);
    tokio::time::sleep(Duration::from_millis(500)).await;
    queue.connectivity().set_online(false);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.pending_count(), 1);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn worker_drains_restored_queue_on_startup() {
    let store = Arc::new(MemoryQueueStore::with_items(vec![SyncQueueItem {
        id: "restored-1".to_string(),
        operation: SyncOperation::Create,
        collection: "expenses".to_string(),
        payload: serde_json::json!({ "n": 1 }),
        enqueued_at: 0,
        retry_count: 1,
    }]));
    let remote = Arc::new(CountingRemote::default());
    let queue = Arc::new(
        SyncQueue::new(store.clone(), remote.clone(), Connectivity::new(true), clock()).unwrap(),
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(SyncWorker::new(queue.clone(), shutdown.clone()).run());

    for _ in 0..50 {
        if queue.pending_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    assert!(store.snapshot().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}
