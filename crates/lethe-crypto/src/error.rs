//! Error types for lethe-crypto

use thiserror::Error;

/// Errors that can occur during the field transform
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Key encoding failed: {0}")]
    KeyEncodingFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for transform operations
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_display() {
        let err = CryptoError::EncryptionFailed("bad key".to_string());
        assert!(format!("{}", err).contains("Encryption failed"));
        assert!(format!("{}", err).contains("bad key"));

        let err = CryptoError::KeyGenerationFailed("rng error".to_string());
        assert!(format!("{}", err).contains("Key generation failed"));

        let err = CryptoError::KeyEncodingFailed("pem error".to_string());
        assert!(format!("{}", err).contains("Key encoding failed"));

        let err = CryptoError::Serialization("bad json".to_string());
        assert!(format!("{}", err).contains("Serialization error"));
    }
}
