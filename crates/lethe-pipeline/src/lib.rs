//! # Lethe Pipeline
//!
//! The access log encryption and batched-ingestion pipeline.
//!
//! One call surface is exposed to the surrounding relay:
//! [`AccessLogPipeline::log_access`], invoked once per inbound request.
//! Internally a call flows through:
//!
//! 1. **Rate limiter** - per-identity sliding window; rejected calls are
//!    silently dropped, not erred.
//! 2. **Worker pool** - the five metadata fields are dispatched
//!    concurrently to encryption executors running the one-way field
//!    transform from `lethe-crypto`.
//! 3. **Batch queue & flusher** - encrypted records accumulate and are
//!    committed in atomic batches with retry and exponential backoff.
//! 4. **Retention sweeper** - an independent background task purges
//!    records past the retention horizon in bounded chunks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lethe_core::AccessLogInput;
//! use lethe_pipeline::{AccessLogPipeline, PipelineConfig};
//! use lethe_storage::SqliteAccessLogStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(SqliteAccessLogStore::open("access_log.db").await.unwrap());
//!     let pipeline = AccessLogPipeline::new(store, PipelineConfig::default());
//!
//!     pipeline
//!         .log_access(AccessLogInput::new("203.0.113.7", "DE, Berlin", "linux", "desktop"))
//!         .await
//!         .unwrap();
//!
//!     pipeline.shutdown().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod flusher;
pub mod metrics;
pub mod pipeline;
pub mod rate_limit;
pub mod sweeper;
pub mod worker;

// Re-exports
pub use config::{FlushConfig, PipelineConfig, RateLimitConfig, RetentionConfig};
pub use error::PipelineError;
pub use flusher::BatchFlusher;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::AccessLogPipeline;
pub use rate_limit::RateLimiter;
pub use worker::WorkerPool;
