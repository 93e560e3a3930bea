//! Test doubles shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, for other crates, through the
//! `test-util` feature.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use std::sync::Arc;

use burnlink_common::{Passcode, Result};
use burnlink_crypto::{
    aead, CryptoProvider, DerivedKey, KdfParams, Nonce, OsRandom, RandomSource, Salt,
    SeededRandom, KEY_LENGTH,
};

/// Provider with a single-hash derive so tests do not pay the KDF cost.
/// The cipher is the real one; randomness is pluggable.
pub struct FastProvider {
    random: Box<dyn RandomSource>,
}

impl FastProvider {
    /// Fast derive with OS randomness.
    pub fn new() -> Self {
        Self::with_random(OsRandom)
    }

    /// Fast derive with a caller-supplied random source.
    pub fn with_random(random: impl RandomSource + 'static) -> Self {
        Self {
            random: Box::new(random),
        }
    }
}

impl Default for FastProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for FastProvider {
    fn derive(&self, passcode: &Passcode, salt: &Salt, _params: &KdfParams) -> Result<DerivedKey> {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(salt.as_bytes());
        hasher.update(passcode.as_bytes());

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&hasher.finalize());
        Ok(DerivedKey::from_bytes(key))
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

pub fn fast_provider() -> Arc<dyn CryptoProvider> {
    Arc::new(FastProvider::new())
}

/// Fast provider whose salts and nonces repeat for the same `seed`.
pub fn seeded_fast_provider(seed: u64) -> Arc<dyn CryptoProvider> {
    Arc::new(FastProvider::with_random(SeededRandom::new(seed)))
}
