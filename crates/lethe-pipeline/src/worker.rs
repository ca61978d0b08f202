//! Encryption worker pool.
//!
//! A fixed set of executor tasks created at pipeline startup, each fed by
//! its own unbounded channel. Dispatch picks the first non-busy worker and
//! falls back to round-robin when all are busy - a busy worker is then
//! assigned another job rather than the caller waiting; the job queues in
//! that worker's channel. There is no backpressure at this layer.
//!
//! A per-slot supervisor respawns a worker that dies mid-job. The jobs
//! in flight on the dead worker fail; retrying is the batch layer's
//! concern, not this one's.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use lethe_crypto::{CryptoResult, TransformedField, transform};

use crate::error::PipelineError;

/// One encryption request travelling to a worker.
struct EncryptJob {
    plaintext: String,
    reply: oneshot::Sender<CryptoResult<TransformedField>>,
}

/// Shared handle to one worker: its job channel and availability flag.
struct WorkerSlot {
    index: usize,
    /// `None` once the pool has shut down.
    sender: RwLock<Option<mpsc::UnboundedSender<EncryptJob>>>,
    busy: AtomicBool,
}

/// Fixed-size pool of encryption executors.
pub struct WorkerPool {
    slots: Vec<Arc<WorkerSlot>>,
    next: AtomicUsize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) and their supervisors.
    pub fn new(size: usize) -> Self {
        let slots = (0..size.max(1)).map(spawn_slot).collect();
        Self {
            slots,
            next: AtomicUsize::new(0),
        }
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Run the field transform on a worker and await the result.
    pub async fn dispatch(&self, plaintext: &str) -> Result<TransformedField, PipelineError> {
        let slot = self.select_slot();
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = EncryptJob {
            plaintext: plaintext.to_string(),
            reply: reply_tx,
        };

        let sender = slot.sender.read().clone();
        let Some(sender) = sender else {
            return Err(PipelineError::ShuttingDown);
        };
        // Marked at assignment, cleared by the worker per completed job
        slot.busy.store(true, Ordering::Release);
        sender.send(job).map_err(|_| {
            PipelineError::WorkerUnavailable(format!("worker {} is restarting", slot.index))
        })?;

        match reply_rx.await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PipelineError::Encryption(format!(
                "worker {} dropped the job",
                slot.index
            ))),
        }
    }

    /// First non-busy worker, else round-robin across all of them.
    fn select_slot(&self) -> &Arc<WorkerSlot> {
        if let Some(slot) = self.slots.iter().find(|s| !s.busy.load(Ordering::Acquire)) {
            return slot;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        &self.slots[index]
    }

    /// Close every worker channel. Queued jobs still complete; new
    /// dispatches fail with [`PipelineError::ShuttingDown`].
    pub fn shutdown(&self) {
        for slot in &self.slots {
            slot.sender.write().take();
        }
    }
}

fn spawn_slot(index: usize) -> Arc<WorkerSlot> {
    let (tx, rx) = mpsc::unbounded_channel();
    let slot = Arc::new(WorkerSlot {
        index,
        sender: RwLock::new(Some(tx)),
        busy: AtomicBool::new(false),
    });
    tokio::spawn(supervise(Arc::clone(&slot), rx));
    slot
}

/// Keep one slot staffed: run the worker, and if it dies, install a fresh
/// channel and run another. Jobs queued on the dead worker are lost - the
/// reply channels drop and their callers see the failure.
async fn supervise(slot: Arc<WorkerSlot>, rx: mpsc::UnboundedReceiver<EncryptJob>) {
    let mut rx = rx;
    loop {
        let worker = tokio::spawn(worker_loop(Arc::clone(&slot), rx));
        match worker.await {
            // Channel closed: clean pool shutdown
            Ok(()) => break,
            Err(e) => {
                warn!(worker = slot.index, error = %e, "encryption worker died, respawning");
                slot.busy.store(false, Ordering::Release);

                let (tx, fresh_rx) = mpsc::unbounded_channel();
                let mut sender = slot.sender.write();
                if sender.is_none() {
                    // Pool shut down while the worker was dead
                    break;
                }
                *sender = Some(tx);
                drop(sender);
                rx = fresh_rx;
            }
        }
    }
}

async fn worker_loop(slot: Arc<WorkerSlot>, mut rx: mpsc::UnboundedReceiver<EncryptJob>) {
    debug!(worker = slot.index, "encryption worker started");
    while let Some(job) = rx.recv().await {
        let result = run_job(&job.plaintext);
        // Caller may have gone away; nothing to do about it
        let _ = job.reply.send(result);
        slot.busy.store(false, Ordering::Release);
    }
    debug!(worker = slot.index, "encryption worker stopped");
}

fn run_job(plaintext: &str) -> CryptoResult<TransformedField> {
    #[cfg(test)]
    {
        if plaintext == tests::PANIC_PLAINTEXT {
            panic!("injected worker crash");
        }
    }
    transform(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    pub(super) const PANIC_PLAINTEXT: &str = "__worker_panic__";

    #[tokio::test]
    async fn test_dispatch_returns_transformed_field() {
        let pool = WorkerPool::new(2);
        let out = pool.dispatch("203.0.113.7").await.unwrap();
        assert!(out.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(!out.encrypted.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatches() {
        let pool = Arc::new(WorkerPool::new(4));
        let mut handles = Vec::new();
        for i in 0..3 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(
                async move { pool.dispatch(&format!("field-{i}")).await },
            ));
        }

        let mut keys = Vec::new();
        for handle in handles {
            let out = handle.await.unwrap().unwrap();
            keys.push(out.public_key);
        }
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 3, "every dispatch gets its own ephemeral key");
    }

    #[tokio::test]
    async fn test_round_robin_fallback_when_all_busy() {
        let pool = WorkerPool::new(3);
        for slot in &pool.slots {
            slot.busy.store(true, Ordering::Release);
        }

        // With every worker busy, selection must still rotate
        let first = pool.select_slot().index;
        let second = pool.select_slot().index;
        let third = pool.select_slot().index;
        assert_ne!(first, second);
        assert_ne!(second, third);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_respawns_after_panic() {
        let pool = WorkerPool::new(1);

        let err = pool.dispatch(PANIC_PLAINTEXT).await.unwrap_err();
        assert!(matches!(err, PipelineError::Encryption(_)));

        // The supervisor swaps in a fresh worker; allow it a moment
        let mut recovered = false;
        for _ in 0..50 {
            match pool.dispatch("after crash").await {
                Ok(_) => {
                    recovered = true;
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        assert!(recovered, "pool never recovered after worker crash");
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_jobs() {
        let pool = WorkerPool::new(2);
        pool.shutdown();
        let err = pool.dispatch("anything").await.unwrap_err();
        assert!(matches!(err, PipelineError::ShuttingDown));
    }
}
