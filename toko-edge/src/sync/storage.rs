//! Durable storage for the offline queue
//!
//! The whole queue is rewritten in a single write transaction, so a crash
//! leaves either the previous snapshot or the new one.

use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::models::SyncQueueItem;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Queue table: key = position in queue, value = JSON item
const SYNC_QUEUE_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("sync_queue");

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue store unavailable: {0}")]
    Unavailable(String),
}

pub type QueueStoreResult<T> = Result<T, QueueStoreError>;

/// Persistence for queued operations
pub trait QueueStore: Send + Sync {
    /// Items in enqueue order
    fn load(&self) -> QueueStoreResult<Vec<SyncQueueItem>>;

    /// Replace the stored queue with `items`
    fn save(&self, items: &[SyncQueueItem]) -> QueueStoreResult<()>;
}

/// redb-backed queue store
#[derive(Clone)]
pub struct RedbQueueStore {
    db: Arc<Database>,
}

impl RedbQueueStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> QueueStoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> QueueStoreResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> QueueStoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SYNC_QUEUE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored items
    pub fn len(&self) -> QueueStoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNC_QUEUE_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> QueueStoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl QueueStore for RedbQueueStore {
    fn load(&self) -> QueueStoreResult<Vec<SyncQueueItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNC_QUEUE_TABLE)?;

        let mut items = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    fn save(&self, items: &[SyncQueueItem]) -> QueueStoreResult<()> {
        let encoded = items
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SYNC_QUEUE_TABLE)?;
            table.retain(|_, _| false)?;
            for (position, value) in encoded.iter().enumerate() {
                table.insert(position as u64, value.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// In-memory queue store
#[derive(Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<SyncQueueItem>>,
    fail_saves: AtomicBool,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<SyncQueueItem>) -> Self {
        Self {
            items: Mutex::new(items),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent saves fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<SyncQueueItem> {
        self.items.lock().clone()
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self) -> QueueStoreResult<Vec<SyncQueueItem>> {
        Ok(self.items.lock().clone())
    }

    fn save(&self, items: &[SyncQueueItem]) -> QueueStoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(QueueStoreError::Unavailable("save disabled".to_string()));
        }
        *self.items.lock() = items.to_vec();
        Ok(())
    }
}
