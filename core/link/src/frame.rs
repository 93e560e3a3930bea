//! Payload framing.
//!
//! Frame format:
//! ```text
//! +------------------+------------------+-----------------------------+
//! |   Salt           |   Nonce          |   Ciphertext || Tag         |
//! |   (16 bytes)     |   (12 bytes)     |   (variable)                |
//! +------------------+------------------+-----------------------------+
//! ```
//!
//! Field lengths are fixed, so there are no length prefixes. Text and media
//! share this framing; envelope metadata travels in cleartext link fields.

use burnlink_common::{Error, Result};
use burnlink_crypto::{Nonce, Salt, NONCE_SIZE, SALT_SIZE};

/// Header size: salt (16) + nonce (12) = 28 bytes.
pub const HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE;

/// An encrypted payload: everything the recipient needs except the passcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// KDF salt.
    pub salt: Salt,
    /// AEAD nonce.
    pub nonce: Nonce,
    /// Cipher output, tag included.
    pub ciphertext: Vec<u8>,
}

impl Payload {
    /// Assemble a payload from its parts.
    pub fn new(salt: Salt, nonce: Nonce, ciphertext: Vec<u8>) -> Self {
        Self {
            salt,
            nonce,
            ciphertext,
        }
    }

    /// Encode to `salt || nonce || ciphertext`.
    pub fn pack(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.ciphertext.len());
        bytes.extend_from_slice(self.salt.as_bytes());
        bytes.extend_from_slice(self.nonce.as_bytes());
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Decode from `salt || nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// `MalformedPayload` if fewer than `HEADER_SIZE` bytes are given. An
    /// empty ciphertext region is accepted here and rejected by the cipher.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::MalformedPayload(format!(
                "payload too short: {} bytes (minimum {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let (salt_bytes, rest) = bytes.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(salt_bytes);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            salt: Salt::from_bytes(salt),
            nonce: Nonce::from_bytes(nonce),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Size of the packed form in bytes.
    pub fn packed_len(&self) -> usize {
        HEADER_SIZE + self.ciphertext.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Payload {
        Payload::new(
            Salt::from_bytes([0xAA; SALT_SIZE]),
            Nonce::from_bytes([0xBB; NONCE_SIZE]),
            vec![1, 2, 3, 4, 5],
        )
    }

    #[test]
    fn test_pack_layout() {
        let bytes = sample().pack();

        assert_eq!(bytes.len(), HEADER_SIZE + 5);
        assert_eq!(&bytes[..SALT_SIZE], &[0xAA; SALT_SIZE]);
        assert_eq!(&bytes[SALT_SIZE..HEADER_SIZE], &[0xBB; NONCE_SIZE]);
        assert_eq!(&bytes[HEADER_SIZE..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unpack_restores_fields() {
        let payload = sample();
        let restored = Payload::unpack(&payload.pack()).unwrap();

        assert_eq!(restored, payload);
        assert_eq!(restored.packed_len(), HEADER_SIZE + 5);
    }

    #[test]
    fn test_unpack_too_short() {
        let result = Payload::unpack(&[0u8; HEADER_SIZE - 1]);
        assert!(matches!(result, Err(Error::MalformedPayload(_))));
    }

    #[test]
    fn test_unpack_header_only() {
        let payload = Payload::unpack(&[0u8; HEADER_SIZE]).unwrap();
        assert!(payload.ciphertext.is_empty());
    }
}
