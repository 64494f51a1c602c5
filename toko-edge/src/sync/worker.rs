//! Background tasks driving the sync queue
//!
//! [`SyncWorker`] drains the queue when the device comes back online (after a
//! short settle delay), on start-up, and periodically while items remain.
//! [`ConnectivityProbe`] feeds [`Connectivity`] from the backend health check.

use shared::error::AppError;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::connectivity::Connectivity;
use super::queue::{DrainOutcome, SyncQueue};
use super::remote::RemoteBackend;

/// Wait after reconnecting before draining
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
/// Retry pass interval while items remain
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 60;
/// Health probe interval
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;
/// `tokio::time::interval` rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct SyncWorker {
    queue: Arc<SyncQueue>,
    shutdown: CancellationToken,
    settle_delay: Duration,
    retry_interval: Duration,
}

impl SyncWorker {
    pub fn new(queue: Arc<SyncQueue>, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            shutdown,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Run until the shutdown token is cancelled
    ///
    /// 1. Drain on startup if online and non-empty
    /// 2. offline → online: drain after the settle delay
    /// 3. Periodic retry pass while items remain
    pub async fn run(self) {
        tracing::info!("SyncWorker started");

        let mut online_rx = self.queue.connectivity().subscribe();
        let mut was_online = *online_rx.borrow_and_update();

        if was_online && self.queue.pending_count() > 0 {
            self.drain("startup").await;
        }

        let mut retry_interval = tokio::time::interval(self.retry_interval);
        retry_interval.tick().await; // skip immediate tick

        let mut settle_deadline: Option<Instant> = None;

        loop {
            let sleep_until =
                settle_deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("SyncWorker shutting down");
                    break;
                }

                _ = tokio::time::sleep_until(sleep_until), if settle_deadline.is_some() => {
                    settle_deadline = None;
                    if self.queue.pending_count() > 0 {
                        self.drain("reconnect").await;
                    }
                }

                _ = retry_interval.tick() => {
                    if settle_deadline.is_none()
                        && self.queue.is_online()
                        && self.queue.pending_count() > 0
                    {
                        self.drain("periodic").await;
                    }
                }

                changed = online_rx.changed() => {
                    if changed.is_err() {
                        tracing::info!("Connectivity channel closed, SyncWorker stopping");
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online && !was_online {
                        settle_deadline = Some(Instant::now() + self.settle_delay);
                    } else if !online {
                        settle_deadline = None;
                    }
                    was_online = online;
                }
            }
        }

        tracing::info!("SyncWorker stopped");
    }

    async fn drain(&self, trigger: &'static str) {
        match self.queue.drain().await {
            DrainOutcome::Completed(report) => {
                for item in &report.discarded {
                    let err = AppError::from(item);
                    tracing::error!(trigger, code = %err.code, "{}", err.message);
                }
                tracing::debug!(
                    trigger,
                    applied = report.applied,
                    pending = report.pending,
                    "Sync pass complete"
                );
            }
            DrainOutcome::Skipped { reason } => {
                tracing::debug!(trigger, ?reason, "Sync pass skipped");
            }
        }
    }
}

/// Periodically pings the backend and publishes reachability
pub struct ConnectivityProbe {
    remote: Arc<dyn RemoteBackend>,
    connectivity: Connectivity,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ConnectivityProbe {
    pub fn new(
        remote: Arc<dyn RemoteBackend>,
        connectivity: Connectivity,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            remote,
            connectivity,
            interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            shutdown,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub async fn run(self) {
        tracing::info!("ConnectivityProbe started");
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let online = self.remote.ping().await;
                    self.connectivity.set_online(online);
                }
            }
        }

        tracing::info!("ConnectivityProbe stopped");
    }
}
