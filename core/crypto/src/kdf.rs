//! Passcode-based key derivation.
//!
//! Two salted, iterated constructions are supported:
//! - PBKDF2-HMAC-SHA256 with a fixed 100 000 iterations (the default)
//! - Argon2id, memory-hard, for senders who opt into it
//!
//! The recipient learns which one was used from the link itself, so the
//! parameters for each algorithm are fixed constants rather than tunables.

use argon2::{Algorithm, Argon2, Params, Version};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use crate::keys::{DerivedKey, Salt, KEY_LENGTH};
use burnlink_common::{Error, Passcode, Result};

/// Minimum PBKDF2 iteration count accepted for derivation.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Key derivation algorithm carried by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    /// PBKDF2-HMAC-SHA256.
    #[default]
    Pbkdf2,
    /// Argon2id.
    Argon2id,
}

impl KdfAlgorithm {
    /// Wire name used in link fields and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            KdfAlgorithm::Pbkdf2 => "pbkdf2",
            KdfAlgorithm::Argon2id => "argon2id",
        }
    }

    /// The fixed parameter set for this algorithm.
    pub fn params(&self) -> KdfParams {
        match self {
            KdfAlgorithm::Pbkdf2 => KdfParams::Pbkdf2 {
                iterations: MIN_PBKDF2_ITERATIONS,
            },
            KdfAlgorithm::Argon2id => KdfParams::Argon2id {
                memory_cost: 65536, // 64 MiB
                time_cost: 3,
                parallelism: 4,
            },
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pbkdf2" => Ok(KdfAlgorithm::Pbkdf2),
            "argon2id" => Ok(KdfAlgorithm::Argon2id),
            other => Err(Error::InvalidInput(format!(
                "Unknown key derivation algorithm: {}",
                other
            ))),
        }
    }
}

/// Concrete parameters for one derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParams {
    /// PBKDF2-HMAC-SHA256.
    Pbkdf2 {
        /// Number of HMAC iterations.
        iterations: u32,
    },
    /// Argon2id.
    Argon2id {
        /// Memory cost in KiB.
        memory_cost: u32,
        /// Number of passes.
        time_cost: u32,
        /// Degree of parallelism.
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfAlgorithm::default().params()
    }
}

/// Derive a 256-bit key from a passcode and salt.
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if the PBKDF2 iteration count is below the minimum
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - Passcode is not stored or logged
pub fn derive_key(passcode: &Passcode, salt: &Salt, params: &KdfParams) -> Result<DerivedKey> {
    let mut key_bytes = [0u8; KEY_LENGTH];

    match params {
        KdfParams::Pbkdf2 { iterations } => {
            if *iterations < MIN_PBKDF2_ITERATIONS {
                return Err(Error::Crypto(format!(
                    "PBKDF2 iteration count {} is below the minimum of {}",
                    iterations, MIN_PBKDF2_ITERATIONS
                )));
            }
            pbkdf2_hmac::<Sha256>(passcode.as_bytes(), salt.as_bytes(), *iterations, &mut key_bytes);
        }
        KdfParams::Argon2id {
            memory_cost,
            time_cost,
            parallelism,
        } => {
            let argon2_params =
                Params::new(*memory_cost, *time_cost, *parallelism, Some(KEY_LENGTH))
                    .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
                .hash_password_into(passcode.as_bytes(), salt.as_bytes(), &mut key_bytes)
                .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))?;
        }
    }

    Ok(DerivedKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passcode(s: &str) -> Passcode {
        Passcode::new(s).unwrap()
    }

    fn cheap_argon2() -> KdfParams {
        KdfParams::Argon2id {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_pbkdf2_deterministic() {
        let salt = Salt::from_bytes([42u8; 16]);
        let params = KdfParams::default();

        let key1 = derive_key(&passcode("correct-horse"), &salt, &params).unwrap();
        let key2 = derive_key(&passcode("correct-horse"), &salt, &params).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_pbkdf2_different_salt() {
        let params = KdfParams::default();

        let key1 = derive_key(&passcode("pw"), &Salt::from_bytes([1u8; 16]), &params).unwrap();
        let key2 = derive_key(&passcode("pw"), &Salt::from_bytes([2u8; 16]), &params).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_pbkdf2_low_iterations_rejected() {
        let salt = Salt::from_bytes([0u8; 16]);
        let params = KdfParams::Pbkdf2 { iterations: 1000 };

        assert!(derive_key(&passcode("pw"), &salt, &params).is_err());
    }

    #[test]
    fn test_argon2id_different_password() {
        let salt = Salt::from_bytes([9u8; 16]);

        let key1 = derive_key(&passcode("password1"), &salt, &cheap_argon2()).unwrap();
        let key2 = derive_key(&passcode("password2"), &salt, &cheap_argon2()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_algorithms_disagree() {
        let salt = Salt::from_bytes([5u8; 16]);

        let pbkdf2 = derive_key(&passcode("pw"), &salt, &KdfParams::default()).unwrap();
        let argon2 = derive_key(&passcode("pw"), &salt, &cheap_argon2()).unwrap();

        assert_ne!(pbkdf2.as_bytes(), argon2.as_bytes());
    }

    #[test]
    fn test_invalid_argon2_params() {
        let salt = Salt::from_bytes([5u8; 16]);
        let params = KdfParams::Argon2id {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
        };

        assert!(derive_key(&passcode("pw"), &salt, &params).is_err());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("pbkdf2".parse::<KdfAlgorithm>().unwrap(), KdfAlgorithm::Pbkdf2);
        assert_eq!("argon2id".parse::<KdfAlgorithm>().unwrap(), KdfAlgorithm::Argon2id);
        assert!("scrypt".parse::<KdfAlgorithm>().is_err());
        assert_eq!(KdfAlgorithm::Argon2id.to_string(), "argon2id");
    }

    #[test]
    fn test_algorithm_serde_name() {
        let json = serde_json::to_string(&KdfAlgorithm::Argon2id).unwrap();
        assert_eq!(json, "\"argon2id\"");
    }
}
