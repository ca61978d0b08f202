//! Configuration for the access log pipeline

use std::time::Duration;

/// Configuration for an [`AccessLogPipeline`](crate::AccessLogPipeline)
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of encryption worker executors
    pub workers: usize,
    /// Admission control configuration
    pub rate_limit: RateLimitConfig,
    /// Batch queue and flusher configuration
    pub flush: FlushConfig,
    /// Retention sweeper configuration
    pub retention: RetentionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            rate_limit: RateLimitConfig::default(),
            flush: FlushConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the worker pool size
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the rate limit configuration
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the flush configuration
    pub fn with_flush(mut self, flush: FlushConfig) -> Self {
        self.flush = flush;
        self
    }

    /// Set the retention configuration
    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }
}

/// Sliding-window admission control parameters
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Maximum admitted attempts per identity per window
    pub max_attempts: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_attempts: 5,
        }
    }
}

/// Batch queue and flusher parameters
#[derive(Debug, Clone)]
pub struct FlushConfig {
    /// Queue length that triggers an immediate flush
    pub batch_size: usize,
    /// Delay after the first unflushed item before a timer flush
    pub debounce: Duration,
    /// Retries after the initial failed attempt
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `retry_backoff * 2^n`
    pub retry_backoff: Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            debounce: Duration::from_millis(100),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Retention sweeper parameters
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Age past which records are purged
    pub horizon: Duration,
    /// Interval between sweeps (the first sweep runs at startup)
    pub sweep_interval: Duration,
    /// Maximum rows deleted per chunk transaction
    pub chunk_size: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon: Duration::from_secs(180 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            chunk_size: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.rate_limit.window, Duration::from_millis(60_000));
        assert_eq!(config.rate_limit.max_attempts, 5);
        assert_eq!(config.flush.batch_size, 10);
        assert_eq!(config.flush.debounce, Duration::from_millis(100));
        assert_eq!(config.flush.max_retries, 3);
        assert_eq!(config.retention.horizon, Duration::from_secs(15_552_000));
        assert_eq!(config.retention.chunk_size, 1000);
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::default()
            .with_workers(2)
            .with_flush(FlushConfig {
                batch_size: 3,
                ..FlushConfig::default()
            });
        assert_eq!(config.workers, 2);
        assert_eq!(config.flush.batch_size, 3);
    }
}
