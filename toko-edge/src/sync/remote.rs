//! Remote backend that queued operations are replayed against

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::models::{SyncOperation, SyncQueueItem};
use std::time::Duration;

use super::error::{SyncError, SyncResult};

/// Header carrying the queue item id so the backend can drop duplicates
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Apply one queued operation. Any error keeps the item queued.
    async fn replay(&self, item: &SyncQueueItem) -> SyncResult<()>;

    /// Reachability probe
    async fn ping(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct ReplayBody<'a> {
    operation: SyncOperation,
    payload: &'a serde_json::Value,
    enqueued_at: i64,
}

/// HTTP client for the sync API
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// `base_url` without trailing slash, e.g. "https://toko.example.com"
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Client(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn replay(&self, item: &SyncQueueItem) -> SyncResult<()> {
        let url = format!("{}/api/sync/{}", self.base_url, item.collection);
        let body = ReplayBody {
            operation: item.operation,
            payload: &item.payload,
            enqueued_at: item.enqueued_at,
        };

        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, &item.id)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Timeout(format!("Sync request to {url} timed out: {e}"))
                } else {
                    SyncError::Replay(format!("Sync request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Replay(format!(
                "Sync failed with status {status}: {body}"
            )));
        }

        Ok(())
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Sync backend unreachable: {e}");
                false
            }
        }
    }
}
