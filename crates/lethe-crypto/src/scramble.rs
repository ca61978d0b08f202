//! Plaintext scrambling passes: obfuscation and character inversion.
//!
//! These are the two pre-encryption layers of the field transform. Neither
//! is cryptographically meaningful on its own - they destroy simple
//! frequency analysis of intermediate buffers before the AEAD and RSA
//! layers take over.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Size of the random seed the interleave pattern is derived from.
pub const SEED_SIZE: usize = 32;

/// Interleave the plaintext with a pseudorandom hex pattern.
///
/// A fresh 32-byte seed is drawn per call and hashed with SHA-256; the
/// hex digest (64 characters) is the pattern. Each plaintext character at
/// position `i` is followed by `pattern[i % 64]`, roughly doubling the
/// length. Two calls on the same input produce different outputs.
pub fn obfuscate(plaintext: &str) -> String {
    let mut seed = [0u8; SEED_SIZE];
    rand::rng().fill_bytes(&mut seed);
    let pattern = hex::encode(Sha256::digest(seed));
    let pattern = pattern.as_bytes();

    let mut out = String::with_capacity(plaintext.len() * 2);
    for (i, c) in plaintext.chars().enumerate() {
        out.push(c);
        out.push(pattern[i % pattern.len()] as char);
    }
    out
}

/// Apply the fixed per-character substitution to one character.
///
/// Digits map via `90 - 2*digit`; ASCII letters map via
/// `57 - (uppercase - 'A')`; everything else passes through. The mapping
/// is reversible by construction but is never inverted anywhere in this
/// system.
fn invert_char(c: char) -> char {
    if c.is_ascii_digit() {
        let digit = c as u32 - '0' as u32;
        char::from_u32(90 - 2 * digit).unwrap_or(c)
    } else if c.is_ascii_alphabetic() {
        let upper = c.to_ascii_uppercase() as u32;
        char::from_u32(57 - (upper - 'A' as u32)).unwrap_or(c)
    } else {
        c
    }
}

/// Apply the character inversion pass to a whole string.
pub fn invert_chars(text: &str) -> String {
    text.chars().map(invert_char).collect()
}
