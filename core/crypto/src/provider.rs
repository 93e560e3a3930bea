//! Capability interface over the cryptographic primitives.
//!
//! Link code never calls the KDF, cipher, or random source directly. It goes
//! through a [`CryptoProvider`] so hosts can swap implementations and tests
//! can make salt and nonce generation reproducible.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

use crate::aead;
use crate::kdf::{derive_key, KdfParams};
use crate::keys::{DerivedKey, Nonce, Salt, NONCE_SIZE, SALT_SIZE};
use burnlink_common::{Passcode, Result};

/// Source of random bytes for salts and nonces.
pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]);
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// Seeded generator for reproducible output.
///
/// # Security
/// Only for tests and fixtures. Two providers with the same seed produce
/// identical salts and nonces.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, buf: &mut [u8]) {
        // A poisoned lock still holds a usable generator.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.fill_bytes(buf);
    }
}

/// The primitives the link protocol needs from its host.
pub trait CryptoProvider: Send + Sync {
    /// Derive a key from a passcode and salt.
    fn derive(&self, passcode: &Passcode, salt: &Salt, params: &KdfParams) -> Result<DerivedKey>;

    /// Encrypt, returning ciphertext || tag.
    fn seal(&self, key: &DerivedKey, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt and verify ciphertext || tag.
    fn open(&self, key: &DerivedKey, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Fill `buf` with random bytes.
    fn fill_random(&self, buf: &mut [u8]);

    /// Draw a fresh salt.
    fn generate_salt(&self) -> Salt {
        let mut bytes = [0u8; SALT_SIZE];
        self.fill_random(&mut bytes);
        Salt::from_bytes(bytes)
    }

    /// Draw a fresh nonce.
    fn generate_nonce(&self) -> Nonce {
        let mut bytes = [0u8; NONCE_SIZE];
        self.fill_random(&mut bytes);
        Nonce::from_bytes(bytes)
    }
}

/// Provider backed by this crate's KDF and AEAD implementations.
pub struct StandardProvider {
    random: Box<dyn RandomSource>,
}

impl StandardProvider {
    /// Create a provider using OS randomness.
    pub fn new() -> Self {
        Self::with_random(OsRandom)
    }

    /// Create a provider with a custom random source.
    pub fn with_random(random: impl RandomSource + 'static) -> Self {
        Self {
            random: Box::new(random),
        }
    }
}

impl Default for StandardProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for StandardProvider {
    fn derive(&self, passcode: &Passcode, salt: &Salt, params: &KdfParams) -> Result<DerivedKey> {
        derive_key(passcode, salt, params)
    }

    fn seal(&self, key: &DerivedKey, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
        aead::encrypt(key, nonce, plaintext)
    }

    fn open(&self, key: &DerivedKey, nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
        aead::decrypt(key, nonce, ciphertext)
    }

    fn fill_random(&self, buf: &mut [u8]) {
        self.random.fill(buf);
    }
}
