//! The access log pipeline service object.
//!
//! Explicitly constructed at process startup - there is no global state.
//! The pipeline owns the rate limiter, the encryption worker pool, the
//! batch flusher task, and the retention sweeper task, and is passed by
//! reference (or `Arc`) to the relay middleware that calls
//! [`log_access`](AccessLogPipeline::log_access).

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use lethe_core::{AccessLogInput, EncryptedFields};
use lethe_storage::{AccessLogStore, StorageError};

use crate::config::{PipelineConfig, RetentionConfig};
use crate::error::PipelineError;
use crate::flusher::BatchFlusher;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::rate_limit::RateLimiter;
use crate::sweeper;
use crate::worker::WorkerPool;

/// The access log encryption and ingestion pipeline.
pub struct AccessLogPipeline {
    store: Arc<dyn AccessLogStore>,
    limiter: RateLimiter,
    pool: WorkerPool,
    flusher: BatchFlusher,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
    metrics: Arc<PipelineMetrics>,
    retention: RetentionConfig,
}

impl AccessLogPipeline {
    /// Start the pipeline: spawns the worker pool, the flusher task, and
    /// the retention sweeper (which sweeps once immediately).
    pub fn new(store: Arc<dyn AccessLogStore>, config: PipelineConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let metrics = Arc::new(PipelineMetrics::new());

        let limiter = RateLimiter::new(config.rate_limit.clone());
        let pool = WorkerPool::new(config.workers);
        let flusher = BatchFlusher::spawn(
            Arc::clone(&store),
            config.flush.clone(),
            Arc::clone(&metrics),
        );
        let sweeper_handle = sweeper::spawn(
            Arc::clone(&store),
            config.retention.clone(),
            shutdown_rx,
        );

        info!(
            workers = config.workers,
            batch_size = config.flush.batch_size,
            "access log pipeline started"
        );

        Self {
            store,
            limiter,
            pool,
            flusher,
            sweeper: Mutex::new(Some(sweeper_handle)),
            shutdown_tx,
            metrics,
            retention: config.retention,
        }
    }

    /// Record one access, fire-and-forget from the caller's perspective.
    ///
    /// Resolves once the record is durably committed. Rate-limited calls
    /// resolve `Ok(())` without recording anything - a drop is silent by
    /// contract, not an error. Encryption or persistence failures surface
    /// as errors; no partial record is ever persisted.
    pub async fn log_access(&self, input: AccessLogInput) -> Result<(), PipelineError> {
        if !self.limiter.is_admitted(&input.client_address) {
            self.metrics.record_dropped();
            debug!("access log attempt dropped by rate limiter");
            return Ok(());
        }
        self.metrics.record_admitted();

        // Five fields encrypt concurrently; one failure fails the record
        let timestamp = Utc::now().to_rfc3339();
        let (ip, geo, platform, device, ts) = tokio::try_join!(
            self.pool.dispatch(&input.client_address),
            self.pool.dispatch(&input.geo_location),
            self.pool.dispatch(&input.platform),
            self.pool.dispatch(&input.device),
            self.pool.dispatch(&timestamp),
        )?;

        let fields = EncryptedFields {
            geo_location: geo.encrypted,
            platform: platform.encrypted,
            device: device.encrypted,
            timestamp: ts.encrypted,
            public_key: ip.public_key,
            ip: ip.encrypted,
        };

        self.flusher.enqueue(fields).await
    }

    /// Force a retention sweep outside the schedule.
    pub async fn sweep_now(&self) -> Result<u64, StorageError> {
        sweeper::sweep_once(self.store.as_ref(), &self.retention).await
    }

    /// Snapshot of the pipeline counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of encryption workers.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Stop the sweeper, close the queue, and drain in-flight flushes.
    ///
    /// Calls racing with shutdown fail with
    /// [`PipelineError::ShuttingDown`]; records already queued are
    /// flushed before this returns.
    pub async fn shutdown(&self) {
        info!("access log pipeline shutting down");
        let _ = self.shutdown_tx.send(());
        let sweeper_handle = self.sweeper.lock().take();
        if let Some(handle) = sweeper_handle {
            let _ = handle.await;
        }
        self.pool.shutdown();
        self.flusher.shutdown().await;
        info!("access log pipeline stopped");
    }
}
