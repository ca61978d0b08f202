//! Error types for lethe-pipeline

use thiserror::Error;

use lethe_crypto::CryptoError;
use lethe_storage::StorageError;

/// Errors surfaced to `log_access` callers.
///
/// A rate-limit drop is deliberately not represented here: dropped calls
/// resolve as successes and leave no trace beyond a counter.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A field encryption failed or its worker died mid-job
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The batch insert failed permanently after exhausting retries
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// No worker could accept the job
    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The pipeline is shutting down and no longer accepts records
    #[error("Pipeline shutting down")]
    ShuttingDown,
}

impl From<CryptoError> for PipelineError {
    fn from(err: CryptoError) -> Self {
        PipelineError::Encryption(err.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::Encryption("worker died".to_string());
        assert!(format!("{}", err).contains("Encryption failed"));

        let err = PipelineError::Persistence("database is locked".to_string());
        assert!(format!("{}", err).contains("Persistence failed"));

        let err = PipelineError::ShuttingDown;
        assert!(format!("{}", err).contains("shutting down"));
    }

    #[test]
    fn test_error_conversions() {
        let err: PipelineError = CryptoError::EncryptionFailed("bad".to_string()).into();
        assert!(matches!(err, PipelineError::Encryption(_)));

        let err: PipelineError = StorageError::database("locked").into();
        assert!(matches!(err, PipelineError::Persistence(_)));
    }
}
