//! Retention sweeper.
//!
//! Background task purging records past the retention horizon. One sweep
//! runs at startup and then once per interval; each sweep deletes in
//! bounded chunks until a chunk comes back empty. Failures are logged and
//! swallowed - retention is best-effort and the next interval tries again.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lethe_storage::{AccessLogStore, StorageError};

use crate::config::RetentionConfig;

/// Spawn the sweeper task.
pub fn spawn(
    store: Arc<dyn AccessLogStore>,
    config: RetentionConfig,
    shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(run(store, config, shutdown_rx))
}

async fn run(
    store: Arc<dyn AccessLogStore>,
    config: RetentionConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(
        horizon_days = config.horizon.as_secs() / 86_400,
        interval_secs = config.sweep_interval.as_secs(),
        "retention sweeper started"
    );

    // The first tick fires immediately: one sweep at startup
    let mut interval = tokio::time::interval(config.sweep_interval);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("retention sweeper shutting down");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep_once(store.as_ref(), &config).await {
                    warn!(error = %e, "retention sweep failed");
                }
            }
        }
    }
}

/// Run one full sweep: chunked deletes until nothing old remains.
///
/// Exposed so operators (and tests) can force a sweep outside the
/// schedule. Returns the number of records purged.
pub async fn sweep_once(
    store: &dyn AccessLogStore,
    config: &RetentionConfig,
) -> Result<u64, StorageError> {
    let cutoff = Utc::now() - ChronoDuration::seconds(config.horizon.as_secs() as i64);

    let mut purged = 0u64;
    loop {
        let deleted = store.purge_older_than(cutoff, config.chunk_size).await?;
        purged += deleted;
        if deleted == 0 {
            break;
        }
        debug!(deleted, "retention chunk deleted");
    }

    if purged > 0 {
        info!(purged, "retention sweep complete");
    }
    Ok(purged)
}
