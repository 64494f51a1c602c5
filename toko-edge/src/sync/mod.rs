//! Offline sync
//!
//! - [`SyncQueue`]: durable FIFO of mutations made while offline
//! - [`SyncWorker`]: drains it on reconnect and periodically
//! - [`RemoteBackend`] / [`HttpRemote`]: where operations are replayed
//! - [`QueueStore`] / [`RedbQueueStore`]: where the queue survives restarts

mod connectivity;
mod error;
mod queue;
mod remote;
mod storage;
mod worker;

pub use connectivity::Connectivity;
pub use error::{SyncError, SyncResult};
pub use queue::{
    DEFAULT_MAX_RETRIES, DiscardedItem, DrainOutcome, DrainReport, EnqueueReceipt, ReplayState,
    SkipReason, SyncQueue, SyncStatus,
};
pub use remote::{HttpRemote, IDEMPOTENCY_HEADER, RemoteBackend};
pub use storage::{MemoryQueueStore, QueueStore, QueueStoreError, QueueStoreResult, RedbQueueStore};
pub use worker::{
    ConnectivityProbe, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_RETRY_INTERVAL_SECS,
    DEFAULT_SETTLE_DELAY_MS, SyncWorker,
};
