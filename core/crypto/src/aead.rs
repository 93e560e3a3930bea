//! Authenticated encryption using ChaCha20-Poly1305.
//!
//! The cipher output is `ciphertext || tag` with a 16-byte Poly1305 tag; it
//! is handled as one opaque blob by the payload framer. The nonce is supplied
//! by the caller and carried separately in the payload.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key,
};

use crate::keys::{DerivedKey, Nonce};
use burnlink_common::{Error, Result};

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt plaintext under `key` and `nonce`.
///
/// # Postconditions
/// - Returns ciphertext || tag
/// - Output length is plaintext length + TAG_SIZE
///
/// # Security
/// - Caller is responsible for never reusing a (key, nonce) pair
pub fn encrypt(key: &DerivedKey, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .encrypt(chacha20poly1305::Nonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))
}

/// Decrypt and verify ciphertext || tag under `key` and `nonce`.
///
/// # Errors
/// - `Error::Authentication` if the input is shorter than a tag or the tag
///   does not verify. Wrong keys and tampered bytes are indistinguishable.
pub fn decrypt(key: &DerivedKey, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::Authentication);
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(chacha20poly1305::Nonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|_| Error::Authentication)
}
