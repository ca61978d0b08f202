//! # Lethe Core
//!
//! Core types for the Lethe access log pipeline.
//!
//! This crate defines the data that flows through the pipeline: the
//! plaintext request metadata handed in by the relay middleware, the
//! encrypted field set produced by the transform workers, and the
//! record shape that is persisted to the log table.
//!
//! No I/O and no cryptography happens here - those live in
//! `lethe-crypto`, `lethe-storage`, and `lethe-pipeline`.

pub mod record;

// Re-exports
pub use record::{AccessLogInput, EncryptedFields, EncryptedLogRecord};
