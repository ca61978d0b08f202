//! # Lethe Crypto
//!
//! The field transform for the Lethe access log pipeline.
//!
//! One sensitive string goes in; an opaque base64 blob and an ephemeral
//! public key come out. The transform layers four passes in a fixed order
//! (stored legacy records depend on it):
//!
//! 1. **Obfuscation** - interleave the plaintext with a pseudorandom hex
//!    pattern derived from a fresh 32-byte seed (SHA-256).
//! 2. **Character inversion** - a fixed per-character substitution over the
//!    JSON-encoded obfuscated text.
//! 3. **Symmetric layer** - AES-256-GCM under a fresh key and 128-bit nonce.
//! 4. **Asymmetric layer** - the key, nonce, and ciphertext are sealed in
//!    190-byte chunks under a fresh one-time RSA-2048 key with OAEP/SHA-256.
//!
//! ## Security Model
//!
//! This is an **irreversible** scrambling scheme, not recoverable
//! encryption. The RSA private key is generated, used nowhere, and zeroized
//! before [`transform`] returns - no party retains the ability to decrypt.
//! There is deliberately no decrypt counterpart anywhere in this crate.
//!
//! The obfuscation and inversion passes are defense in depth against
//! frequency analysis of intermediate buffers; the AEAD and RSA layers are
//! the actual barrier.

pub mod error;
pub mod scramble;
pub mod transform;

// Re-exports
pub use error::{CryptoError, CryptoResult};
pub use scramble::{invert_chars, obfuscate};
pub use transform::{TransformedField, transform};
