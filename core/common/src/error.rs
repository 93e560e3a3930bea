//! Common error types for burnlink.

use thiserror::Error;

/// Top-level error type for burnlink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input rejected before any cryptographic work.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tag verification failed.
    ///
    /// Deliberately rendered the same way whether the key was wrong or the
    /// ciphertext was corrupted.
    #[error("Wrong passcode")]
    Authentication,

    /// The framed payload could not be unpacked.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The link carries no payload field.
    #[error("Missing payload: {0}")]
    MissingPayload(String),

    /// The link policy fields are inconsistent.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// The link expired or was already consumed.
    #[error("Link expired: {0}")]
    Expired(String),

    /// Too many failed attempts on this link.
    #[error("Locked: {0}")]
    Locked(String),

    /// A decrypt attempt is already running for this link.
    #[error("Busy: {0}")]
    Busy(String),

    /// Cryptographic primitive failed for a reason other than authentication.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether the link that produced this error can never be decrypted again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::MalformedPayload(_)
                | Error::MissingPayload(_)
                | Error::InvalidPolicy(_)
                | Error::Expired(_)
                | Error::Locked(_)
        )
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_hides_cause() {
        assert_eq!(Error::Authentication.to_string(), "Wrong passcode");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(Error::Expired("burned".into()).is_terminal());
        assert!(Error::Locked("3 failures".into()).is_terminal());
        assert!(Error::MissingPayload("msg".into()).is_terminal());
        assert!(!Error::Authentication.is_terminal());
        assert!(!Error::Busy("in flight".into()).is_terminal());
        assert!(!Error::InvalidInput("empty".into()).is_terminal());
    }
}
