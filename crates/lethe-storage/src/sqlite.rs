//! Sqlite-backed storage implementation
//!
//! Production backend for the access log table. The schema is created on
//! open; WAL journaling keeps the retention sweeper's chunked deletes from
//! stalling concurrent batch inserts.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use lethe_core::EncryptedLogRecord;

use crate::AccessLogStore;
use crate::error::StorageError;

/// Sqlite implementation of [`AccessLogStore`].
pub struct SqliteAccessLogStore {
    pool: SqlitePool,
}

impl SqliteAccessLogStore {
    /// Open (or create) the access log database at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %path.as_ref().display(), "access log store opened");
        Ok(store)
    }

    /// Open an in-memory database, for tests.
    ///
    /// Restricted to a single connection: each pooled connection to
    /// `:memory:` would otherwise see its own private database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS access_log (
                id TEXT PRIMARY KEY,
                encrypted_ip TEXT NOT NULL,
                encrypted_geo_loc TEXT NOT NULL,
                encrypted_platform TEXT NOT NULL,
                encrypted_device TEXT NOT NULL,
                encrypted_timestamp TEXT NOT NULL,
                public_key TEXT NOT NULL,
                entropy_mark TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // The sweeper's cutoff scan is the only read path
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_access_log_created_at ON access_log(created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch all record ids, for tests and operational inspection.
    pub async fn record_ids(&self) -> Result<Vec<Uuid>, StorageError> {
        let rows = sqlx::query("SELECT id FROM access_log ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("id");
            let id = Uuid::parse_str(&raw)
                .map_err(|e| StorageError::database(format!("malformed record id: {e}")))?;
            ids.push(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl AccessLogStore for SqliteAccessLogStore {
    async fn insert_batch(&self, records: &[EncryptedLogRecord]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                "INSERT INTO access_log \
                 (id, encrypted_ip, encrypted_geo_loc, encrypted_platform, encrypted_device, \
                  encrypted_timestamp, public_key, entropy_mark, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id.to_string())
            .bind(&record.encrypted_ip)
            .bind(&record.encrypted_geo_loc)
            .bind(&record.encrypted_platform)
            .bind(&record.encrypted_device)
            .bind(&record.encrypted_timestamp)
            .bind(&record.public_key)
            .bind(&record.entropy_mark)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(inserted = records.len(), "batch committed");
        Ok(())
    }

    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<u64, StorageError> {
        // Bounded chunk per transaction keeps the write lock window short
        // so sweeps never stall live inserts.
        let result = sqlx::query(
            "DELETE FROM access_log WHERE id IN \
             (SELECT id FROM access_log WHERE created_at < ? LIMIT ?)",
        )
        .bind(cutoff)
        .bind(i64::from(limit))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
