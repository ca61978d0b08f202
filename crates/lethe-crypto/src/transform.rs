//! The two-stage encryption seal and the composed field transform.
//!
//! Layer order is load-bearing: obfuscate, JSON-encode, invert, AES, RSA.
//! Stored legacy records were produced in exactly this order.

use aes_gcm::{
    AesGcm, Nonce,
    aead::{Aead, KeyInit, OsRng, consts::U16},
    aes::Aes256,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::scramble::{invert_chars, obfuscate};

/// AES-256 key size in bytes.
pub const AES_KEY_SIZE: usize = 32;

/// Nonce size in bytes. 128 bits rather than the common 96-bit GCM
/// default; the stored blob layout depends on it.
pub const AES_NONCE_SIZE: usize = 16;

/// RSA modulus size in bits for the one-time key pair.
pub const RSA_BITS: usize = 2048;

/// RSA-2048 output block size in bytes.
pub const RSA_BLOCK_SIZE: usize = 256;

/// Maximum safe plaintext per RSA-2048 OAEP/SHA-256 block:
/// 256 - 2*32 (hash) - 2 (padding overhead).
pub const RSA_CHUNK_SIZE: usize = 190;

/// AES-256-GCM with the 128-bit nonce the blob layout requires.
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Output of one field transform.
#[derive(Debug, Clone)]
pub struct TransformedField {
    /// Base64-encoded RSA-sealed blob.
    pub encrypted: String,
    /// PEM-encoded ephemeral public key. The private half was zeroized
    /// before this struct was constructed.
    pub public_key: String,
}

/// Transform one sensitive field into an opaque blob and ephemeral key.
///
/// Fresh randomness on every invocation: the same input never produces
/// the same output twice. The result is irreversible - see the crate
/// docs for the security model.
pub fn transform(plaintext: &str) -> CryptoResult<TransformedField> {
    let obfuscated = obfuscate(plaintext);
    let encoded = serde_json::to_string(&obfuscated)
        .map_err(|e| CryptoError::Serialization(e.to_string()))?;
    let inverted = invert_chars(&encoded);
    seal(inverted.as_bytes())
}

/// Seal a scrambled buffer under the symmetric and asymmetric layers.
///
/// The AES key, nonce, and ciphertext (tag appended) are concatenated and
/// encrypted chunk-wise under a one-time RSA-2048 public key with
/// OAEP/SHA-256. The private key never leaves this function.
fn seal(data: &[u8]) -> CryptoResult<TransformedField> {
    // Symmetric layer: fresh key and nonce per call
    let mut key_bytes = [0u8; AES_KEY_SIZE];
    rand::rng().fill_bytes(&mut key_bytes);
    let mut nonce_bytes = [0u8; AES_NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm128::new_from_slice(&key_bytes)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), data)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut payload = Vec::with_capacity(AES_KEY_SIZE + AES_NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&key_bytes);
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&ciphertext);

    // Asymmetric layer: one-time key pair, chunked OAEP
    let private_key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let mut sealed = Vec::with_capacity(payload.len().div_ceil(RSA_CHUNK_SIZE) * RSA_BLOCK_SIZE);
    for chunk in payload.chunks(RSA_CHUNK_SIZE) {
        let block = public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), chunk)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        sealed.extend_from_slice(&block);
    }

    let pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyEncodingFailed(e.to_string()))?;

    // The private key is used nowhere: zeroized on drop, never returned,
    // never serialized. Decryption is impossible from here on.
    drop(private_key);
    payload.zeroize();
    key_bytes.zeroize();

    Ok(TransformedField {
        encrypted: STANDARD.encode(sealed),
        public_key: pem,
    })
}
