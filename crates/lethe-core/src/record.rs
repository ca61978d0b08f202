//! Access log record types.
//!
//! An [`AccessLogInput`] is consumed exactly once per inbound request.
//! Its four fields, plus a capture timestamp, are encrypted independently
//! and assembled into [`EncryptedFields`]. The flusher stamps those fields
//! with an id, an entropy mark, and an insertion instant to form the
//! persisted [`EncryptedLogRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plaintext request metadata supplied by the caller.
///
/// Ephemeral by contract: the pipeline consumes it once and no field of
/// this struct is ever persisted or logged in the clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogInput {
    /// Client network address (also the rate limiting identity).
    pub client_address: String,
    /// Coarse geolocation string as reported by the edge.
    pub geo_location: String,
    /// Client platform (operating system family).
    pub platform: String,
    /// Device description string.
    pub device: String,
}

impl AccessLogInput {
    /// Create an input from the four metadata fields.
    pub fn new(
        client_address: impl Into<String>,
        geo_location: impl Into<String>,
        platform: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            client_address: client_address.into(),
            geo_location: geo_location.into(),
            platform: platform.into(),
            device: device.into(),
        }
    }
}

/// The five encrypted blobs produced for one admitted log call, plus the
/// ephemeral public key retained for the record.
///
/// Every blob is the base64 output of the two-stage field transform. The
/// matching private keys were destroyed inside the transform, so nothing
/// in this struct can be decrypted by any party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedFields {
    /// Encrypted client address.
    pub ip: String,
    /// Encrypted geolocation.
    pub geo_location: String,
    /// Encrypted platform.
    pub platform: String,
    /// Encrypted device.
    pub device: String,
    /// Encrypted capture timestamp (RFC 3339 plaintext before transform).
    pub timestamp: String,
    /// PEM-encoded ephemeral public key retained from the client address
    /// transform. Unique per record; the private half no longer exists.
    pub public_key: String,
}

/// The persisted access log row.
///
/// Immutable after insert; destroyed only by the retention sweeper once
/// older than the retention horizon. `entropy_mark` is 32 random bytes,
/// base64-encoded, stored purely to defeat blob-equality correlation
/// across records - it carries no meaning and is never decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedLogRecord {
    /// Record id.
    pub id: Uuid,
    /// Encrypted client address.
    pub encrypted_ip: String,
    /// Encrypted geolocation.
    pub encrypted_geo_loc: String,
    /// Encrypted platform.
    pub encrypted_platform: String,
    /// Encrypted device.
    pub encrypted_device: String,
    /// Encrypted capture timestamp.
    pub encrypted_timestamp: String,
    /// PEM-encoded ephemeral public key, unique per record.
    pub public_key: String,
    /// Random anti-correlation padding, base64-encoded.
    pub entropy_mark: String,
    /// Insertion instant; the only plaintext column, read solely by the
    /// retention sweeper to bound record age.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_log_input_new() {
        let input = AccessLogInput::new("203.0.113.7", "DE, Berlin", "linux", "desktop");
        assert_eq!(input.client_address, "203.0.113.7");
        assert_eq!(input.geo_location, "DE, Berlin");
        assert_eq!(input.platform, "linux");
        assert_eq!(input.device, "desktop");
    }
}
