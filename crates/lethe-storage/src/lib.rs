//! # Lethe Storage
//!
//! Storage abstractions for the Lethe access log pipeline.
//!
//! This crate provides the [`AccessLogStore`] trait the flusher and the
//! retention sweeper write through, plus two backends:
//!
//! - **SqliteAccessLogStore**: sqlite-backed production store with
//!   schema-on-open and WAL journaling
//! - **MemoryAccessLogStore**: in-memory implementation for testing and
//!   simulation
//!
//! ## Example
//!
//! ```rust,ignore
//! use lethe_storage::{AccessLogStore, MemoryAccessLogStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryAccessLogStore::new();
//!     store.insert_batch(&records).await.unwrap();
//!     assert_eq!(store.count().await.unwrap(), records.len() as u64);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod sqlite;

// Re-exports
pub use error::StorageError;
pub use memory::MemoryAccessLogStore;
pub use sqlite::SqliteAccessLogStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lethe_core::EncryptedLogRecord;

/// Trait for durable access log persistence.
///
/// The flusher writes through [`insert_batch`](AccessLogStore::insert_batch)
/// and the retention sweeper deletes through
/// [`purge_older_than`](AccessLogStore::purge_older_than); nothing else in
/// the pipeline touches storage. Implementations must make a batch insert
/// atomic: either every record in the slice becomes visible or none does.
#[async_trait]
pub trait AccessLogStore: Send + Sync {
    /// Insert a batch of records inside a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; in that case no record
    /// of the batch may be visible to readers.
    async fn insert_batch(&self, records: &[EncryptedLogRecord]) -> Result<(), StorageError>;

    /// Delete one bounded chunk of records inserted before `cutoff`.
    ///
    /// At most `limit` rows are removed per call so a sweep never holds
    /// the writer side for long. Returns the number of rows deleted; the
    /// sweeper loops until this reaches zero.
    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<u64, StorageError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<u64, StorageError>;
}
