//! Cryptographic primitives for burnlink.
//!
//! This module provides:
//! - Passcode key derivation (PBKDF2-HMAC-SHA256 or Argon2id)
//! - Authenticated encryption using ChaCha20-Poly1305
//! - Key, salt and nonce types, with the key zeroized on drop
//! - A capability trait bundling derive, seal, open and randomness
//!
//! # Security Guarantees
//! - Key material is automatically zeroized on drop
//! - No passcode, key or plaintext is ever logged
//! - Decryption failures never distinguish a wrong key from corrupted data

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod provider;

pub use aead::{decrypt, encrypt, TAG_SIZE};
pub use kdf::{derive_key, KdfAlgorithm, KdfParams, MIN_PBKDF2_ITERATIONS};
pub use keys::{DerivedKey, Nonce, Salt, KEY_LENGTH, NONCE_SIZE, SALT_SIZE};
pub use provider::{CryptoProvider, OsRandom, RandomSource, SeededRandom, StandardProvider};
