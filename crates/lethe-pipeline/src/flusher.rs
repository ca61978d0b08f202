//! Batch queue and flusher.
//!
//! Admitted records accumulate in an in-memory queue owned by a single
//! flusher task. A flush fires when the queue reaches the batch size or
//! when the debounce timer - armed once, when the first unflushed item
//! arrives - expires. Each flush commits its whole batch in one storage
//! transaction, retrying with exponential backoff; after the retries are
//! exhausted the batch fails permanently and every caller in it sees the
//! error. No partial commits are ever exposed.

use std::collections::VecDeque;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use lethe_core::{EncryptedFields, EncryptedLogRecord};
use lethe_storage::AccessLogStore;

use crate::config::FlushConfig;
use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;

/// Size of the per-record anti-correlation padding.
const ENTROPY_MARK_SIZE: usize = 32;

/// A queued record awaiting durable commit.
struct PendingLogEntry {
    fields: EncryptedFields,
    completion: oneshot::Sender<Result<(), PipelineError>>,
}

/// Handle to the flusher task.
pub struct BatchFlusher {
    /// `None` once shut down.
    tx: RwLock<Option<mpsc::UnboundedSender<PendingLogEntry>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BatchFlusher {
    /// Spawn the flusher task writing through `store`.
    pub fn spawn(
        store: Arc<dyn AccessLogStore>,
        config: FlushConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = FlushTask {
            rx,
            store,
            config,
            metrics,
            queue: VecDeque::new(),
        };
        let handle = tokio::spawn(task.run());
        Self {
            tx: RwLock::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue one record and await its durable commit.
    ///
    /// Resolves `Ok` once the batch containing the record has committed;
    /// resolves with the batch error if the flush failed permanently.
    pub async fn enqueue(&self, fields: EncryptedFields) -> Result<(), PipelineError> {
        let (done_tx, done_rx) = oneshot::channel();
        let entry = PendingLogEntry {
            fields,
            completion: done_tx,
        };

        let sender = self.tx.read().clone();
        let Some(sender) = sender else {
            return Err(PipelineError::ShuttingDown);
        };
        sender.send(entry).map_err(|_| PipelineError::ShuttingDown)?;

        match done_rx.await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Persistence(
                "flusher terminated before commit".to_string(),
            )),
        }
    }

    /// Close the queue and wait for the task to drain every pending entry.
    pub async fn shutdown(&self) {
        self.tx.write().take();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// The task owning the queue.
struct FlushTask {
    rx: mpsc::UnboundedReceiver<PendingLogEntry>,
    store: Arc<dyn AccessLogStore>,
    config: FlushConfig,
    metrics: Arc<PipelineMetrics>,
    queue: VecDeque<PendingLogEntry>,
}

impl FlushTask {
    async fn run(mut self) {
        info!(
            batch_size = self.config.batch_size,
            debounce_ms = self.config.debounce.as_millis() as u64,
            "batch flusher started"
        );

        // Armed when the first unflushed item arrives; never re-armed by
        // later arrivals, so a steady trickle cannot postpone the flush.
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                entry = self.rx.recv() => match entry {
                    Some(entry) => {
                        self.queue.push_back(entry);
                        if self.queue.len() >= self.config.batch_size {
                            self.flush_batch().await;
                            deadline = self.next_deadline();
                        } else if deadline.is_none() {
                            deadline = Some(Instant::now() + self.config.debounce);
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush_batch().await;
                    deadline = self.next_deadline();
                }
            }
        }

        // Channel closed: drain whatever is still queued
        while !self.queue.is_empty() {
            self.flush_batch().await;
        }
        info!("batch flusher stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        if self.queue.is_empty() {
            None
        } else {
            Some(Instant::now() + self.config.debounce)
        }
    }

    /// Flush up to one batch of the oldest queued entries.
    async fn flush_batch(&mut self) {
        let take = self.queue.len().min(self.config.batch_size);
        if take == 0 {
            return;
        }
        let entries: Vec<PendingLogEntry> = self.queue.drain(..take).collect();

        let now = Utc::now();
        let records: Vec<EncryptedLogRecord> = entries
            .iter()
            .map(|entry| build_record(&entry.fields, now))
            .collect();

        let mut attempt = 0u32;
        let failure = loop {
            match self.store.insert_batch(&records).await {
                Ok(()) => break None,
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        break Some(e);
                    }
                    let backoff = self.config.retry_backoff * 2u32.pow(attempt);
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "batch insert failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        };

        match failure {
            None => {
                self.metrics.record_flushed(entries.len() as u64);
                debug!(records = entries.len(), "batch committed");
                for entry in entries {
                    let _ = entry.completion.send(Ok(()));
                }
            }
            Some(e) => {
                self.metrics.flush_failed();
                error!(records = entries.len(), error = %e, "batch failed permanently");
                let message = e.to_string();
                for entry in entries {
                    let _ = entry
                        .completion
                        .send(Err(PipelineError::Persistence(message.clone())));
                }
            }
        }
    }
}

/// Stamp encrypted fields into a persistable record.
fn build_record(fields: &EncryptedFields, created_at: DateTime<Utc>) -> EncryptedLogRecord {
    let mut mark = [0u8; ENTROPY_MARK_SIZE];
    rand::rng().fill_bytes(&mut mark);

    EncryptedLogRecord {
        id: Uuid::new_v4(),
        encrypted_ip: fields.ip.clone(),
        encrypted_geo_loc: fields.geo_location.clone(),
        encrypted_platform: fields.platform.clone(),
        encrypted_device: fields.device.clone(),
        encrypted_timestamp: fields.timestamp.clone(),
        public_key: fields.public_key.clone(),
        entropy_mark: STANDARD.encode(mark),
        created_at,
    }
}
