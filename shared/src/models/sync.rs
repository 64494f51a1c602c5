// shared/src/models/sync.rs
use serde::{Deserialize, Serialize};

/// Kind of mutation captured while offline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

/// 离线队列条目
///
/// A mutating operation recorded while the device was offline, replayed in
/// enqueue order once connectivity returns. `id` doubles as the idempotency
/// key the backend uses to drop duplicate replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub id: String,
    pub operation: SyncOperation,
    /// Target collection (e.g. "transactions", "debts")
    pub collection: String,
    pub payload: serde_json::Value,
    /// Unix millis
    pub enqueued_at: i64,
    /// Failed replay attempts so far
    #[serde(default)]
    pub retry_count: u32,
}
