use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toko_edge::core::{Config, EdgeState};
use toko_edge::sync::{
    Connectivity, ConnectivityProbe, HttpRemote, RedbQueueStore, RemoteBackend, SyncQueue,
    SyncWorker,
};
use toko_edge::utils::clock::system_clock;

/// Stand-in backend when no sync URL is configured: always unreachable
struct Unconfigured;

#[async_trait::async_trait]
impl RemoteBackend for Unconfigured {
    async fn replay(&self, _item: &shared::models::SyncQueueItem) -> toko_edge::sync::SyncResult<()> {
        Err(toko_edge::SyncError::Offline)
    }

    async fn ping(&self) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work dir {}", config.work_dir))?;
    toko_edge::init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );

    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "TokoKu edge starting"
    );

    // 2. 同步队列
    let store = Arc::new(
        RedbQueueStore::open(config.queue_db_path()).context("Failed to open sync queue")?,
    );
    let remote: Arc<dyn RemoteBackend> = match &config.sync_remote_url {
        Some(url) => Arc::new(
            HttpRemote::new(url.clone(), config.request_timeout())
                .context("Failed to build sync client")?,
        ),
        None => {
            tracing::warn!("SYNC_REMOTE_URL not set, running offline only");
            Arc::new(Unconfigured)
        }
    };
    let connectivity = Connectivity::new(remote.ping().await);
    let queue = Arc::new(
        SyncQueue::new(store, remote.clone(), connectivity.clone(), system_clock())
            .context("Failed to restore sync queue")?
            .with_max_retries(config.sync_max_retries),
    );

    // 3. 业务服务
    let state = EdgeState::new(&config, queue.clone(), system_clock());
    tracing::info!(
        tie_break = ?state.checkout.engine().tie_break(),
        debt_due_days = state.checkout.debt_due_days(),
        cogs_ratio = state.reports.cogs_ratio(),
        "Checkout and reports configured"
    );

    // 4. 后台任务
    let shutdown = CancellationToken::new();
    let worker = SyncWorker::new(queue.clone(), shutdown.clone())
        .with_settle_delay(config.settle_delay())
        .with_retry_interval(config.retry_interval());
    let probe = ConnectivityProbe::new(remote, connectivity, shutdown.clone())
        .with_interval(config.probe_interval());

    let worker_handle = tokio::spawn(worker.run());
    let probe_handle = tokio::spawn(probe.run());

    tracing::info!(pending = state.queue.pending_count(), "TokoKu edge ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    let (worker_result, probe_result) = futures::future::join(worker_handle, probe_handle).await;
    if let Err(e) = worker_result.and(probe_result) {
        tracing::error!("Background task failed: {e}");
    }

    tracing::info!(pending = queue.pending_count(), "TokoKu edge stopped");
    Ok(())
}
