//! In-memory storage implementation
//!
//! Suitable for testing and simulation environments; production writes
//! go through the sqlite backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::trace;

use lethe_core::EncryptedLogRecord;

use crate::AccessLogStore;
use crate::error::StorageError;

/// In-memory implementation of [`AccessLogStore`].
///
/// Records are held in insertion order behind a single async mutex, which
/// gives batch inserts the same all-or-nothing visibility the sqlite
/// backend gets from a transaction.
#[derive(Debug, Default)]
pub struct MemoryAccessLogStore {
    records: Mutex<Vec<EncryptedLogRecord>>,
}

impl MemoryAccessLogStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records, in insertion order.
    pub async fn records(&self) -> Vec<EncryptedLogRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AccessLogStore for MemoryAccessLogStore {
    async fn insert_batch(&self, records: &[EncryptedLogRecord]) -> Result<(), StorageError> {
        let mut guard = self.records.lock().await;
        guard.extend_from_slice(records);
        trace!(inserted = records.len(), total = guard.len(), "batch stored");
        Ok(())
    }

    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<u64, StorageError> {
        let mut guard = self.records.lock().await;
        let mut deleted = 0u64;
        guard.retain(|record| {
            if deleted < u64::from(limit) && record.created_at < cutoff {
                deleted += 1;
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.records.lock().await.len() as u64)
    }
}
