//! Sensitive value wrappers used throughout burnlink.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A user-supplied passcode.
///
/// Lives only for the duration of one seal or decrypt call and is zeroized
/// on drop. Never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passcode(String);

impl Passcode {
    /// Wrap a passcode string.
    ///
    /// # Errors
    /// - Returns error if the passcode is empty
    pub fn new(passcode: impl Into<String>) -> crate::Result<Self> {
        let passcode = passcode.into();
        if passcode.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Passcode cannot be empty".to_string(),
            ));
        }
        Ok(Self(passcode))
    }

    /// Get the passcode bytes for key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passcode([REDACTED])")
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
