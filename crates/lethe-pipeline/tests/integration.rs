//! End-to-end pipeline tests against both storage backends.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use lethe_core::{AccessLogInput, EncryptedLogRecord};
use lethe_pipeline::{
    AccessLogPipeline, FlushConfig, PipelineConfig, PipelineError, RateLimitConfig,
};
use lethe_storage::{AccessLogStore, MemoryAccessLogStore, SqliteAccessLogStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_flush() -> FlushConfig {
    FlushConfig {
        batch_size: 10,
        debounce: Duration::from_millis(20),
        ..FlushConfig::default()
    }
}

fn input(address: &str) -> AccessLogInput {
    AccessLogInput::new(address, "DE, Berlin", "linux", "desktop")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_log_access_end_to_end() {
    init_tracing();
    let store = Arc::new(MemoryAccessLogStore::new());
    let pipeline = AccessLogPipeline::new(
        Arc::clone(&store) as Arc<dyn AccessLogStore>,
        PipelineConfig::default().with_workers(2).with_flush(fast_flush()),
    );

    pipeline.log_access(input("203.0.113.7")).await.unwrap();
    pipeline.log_access(input("203.0.113.8")).await.unwrap();

    let records = store.records().await;
    assert_eq!(records.len(), 2);

    for record in &records {
        // Every encrypted column is base64 over whole RSA blocks
        for blob in [
            &record.encrypted_ip,
            &record.encrypted_geo_loc,
            &record.encrypted_platform,
            &record.encrypted_device,
            &record.encrypted_timestamp,
        ] {
            let decoded = STANDARD.decode(blob).unwrap();
            assert!(!decoded.is_empty());
            assert_eq!(decoded.len() % 256, 0);
            // No plaintext leaks into storage in any column
            let haystack = String::from_utf8_lossy(&decoded);
            assert!(!haystack.contains("203.0.113"));
            assert!(!haystack.contains("Berlin"));
            assert!(!haystack.contains("linux"));
            assert!(!haystack.contains("desktop"));
        }

        assert!(record.public_key.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(!record.public_key.contains("PRIVATE"));
        assert_eq!(STANDARD.decode(&record.entropy_mark).unwrap().len(), 32);
    }

    // Per-record uniqueness: ids, keys, and entropy marks never repeat
    assert_ne!(records[0].id, records[1].id);
    assert_ne!(records[0].public_key, records[1].public_key);
    assert_ne!(records[0].entropy_mark, records[1].entropy_mark);

    let metrics = pipeline.metrics();
    assert_eq!(metrics.records_admitted, 2);
    assert_eq!(metrics.records_flushed, 2);
    assert_eq!(metrics.flush_failures, 0);

    pipeline.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rate_limited_calls_resolve_silently() {
    init_tracing();
    let store = Arc::new(MemoryAccessLogStore::new());
    let pipeline = AccessLogPipeline::new(
        Arc::clone(&store) as Arc<dyn AccessLogStore>,
        PipelineConfig::default()
            .with_workers(2)
            .with_flush(fast_flush())
            .with_rate_limit(RateLimitConfig {
                window: Duration::from_secs(60),
                max_attempts: 1,
            }),
    );

    // Same identity twice: the second is dropped, not erred
    pipeline.log_access(input("203.0.113.7")).await.unwrap();
    pipeline.log_access(input("203.0.113.7")).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    let metrics = pipeline.metrics();
    assert_eq!(metrics.records_admitted, 1);
    assert_eq!(metrics.records_dropped, 1);

    pipeline.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_end_to_end_with_retention() {
    init_tracing();
    let store = Arc::new(SqliteAccessLogStore::in_memory().await.unwrap());
    let pipeline = AccessLogPipeline::new(
        Arc::clone(&store) as Arc<dyn AccessLogStore>,
        PipelineConfig::default().with_workers(2).with_flush(fast_flush()),
    );

    pipeline.log_access(input("203.0.113.7")).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    // Plant an expired record behind the pipeline's back
    let expired = EncryptedLogRecord {
        id: Uuid::new_v4(),
        encrypted_ip: "blob".to_string(),
        encrypted_geo_loc: "blob".to_string(),
        encrypted_platform: "blob".to_string(),
        encrypted_device: "blob".to_string(),
        encrypted_timestamp: "blob".to_string(),
        public_key: "-----BEGIN PUBLIC KEY-----".to_string(),
        entropy_mark: "bWFyaw==".to_string(),
        created_at: Utc::now() - ChronoDuration::days(200),
    };
    store.insert_batch(&[expired]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);

    // Only the expired record is purged
    assert_eq!(pipeline.sweep_now().await.unwrap(), 1);
    assert_eq!(store.count().await.unwrap(), 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_log_access_after_shutdown_fails() {
    init_tracing();
    let store = Arc::new(MemoryAccessLogStore::new());
    let pipeline = AccessLogPipeline::new(
        Arc::clone(&store) as Arc<dyn AccessLogStore>,
        PipelineConfig::default().with_flush(fast_flush()),
    );

    pipeline.shutdown().await;

    let err = pipeline.log_access(input("203.0.113.7")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ShuttingDown | PipelineError::WorkerUnavailable(_)
    ));
    assert_eq!(pipeline.worker_count(), 4);
}
