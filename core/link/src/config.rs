//! Share configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codec::DEFAULT_TRANSPORT_WARN_BYTES;
use crate::guard::DEFAULT_MAX_ATTEMPTS;
use burnlink_common::{Error, Result};
use burnlink_crypto::KdfAlgorithm;

/// Default origin share URLs are built on.
pub const DEFAULT_BASE_URL: &str = "https://burnlink.local/";

/// Default limit for attached files (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Longest lifetime accepted for `ttl=24h` links (one year).
pub const MAX_EXPIRING_TTL_HOURS: u32 = 24 * 365;

/// Settings shared by the sealing and opening sides.
///
/// Missing keys in a config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin the share URL is built on.
    pub base_url: String,
    /// Consecutive wrong passcodes before a link locks.
    pub max_attempts: u32,
    /// Advisory payload size above which a warning is raised.
    pub transport_warn_bytes: usize,
    /// Largest file accepted for sealing.
    pub max_file_bytes: usize,
    /// Key derivation used when sealing.
    pub kdf: KdfAlgorithm,
    /// Countdown timer period in milliseconds.
    pub countdown_tick_ms: u64,
    /// Lifetime of links sealed with `ttl=24h`, in hours.
    pub expiring_ttl_hours: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transport_warn_bytes: DEFAULT_TRANSPORT_WARN_BYTES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            kdf: KdfAlgorithm::default(),
            countdown_tick_ms: 1000,
            expiring_ttl_hours: 24,
        }
    }
}

impl ShareConfig {
    /// Check that the settings are usable.
    ///
    /// # Errors
    /// - `InvalidInput` for an unparseable base URL, a zero attempt limit or
    ///   tick, or a lifetime outside `1..=MAX_EXPIRING_TTL_HOURS`
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid base_url: {}", e)))?;

        if self.max_attempts == 0 {
            return Err(Error::InvalidInput("max_attempts must be at least 1".to_string()));
        }
        if self.countdown_tick_ms == 0 {
            return Err(Error::InvalidInput(
                "countdown_tick_ms must be at least 1".to_string(),
            ));
        }
        if self.expiring_ttl_hours == 0 {
            return Err(Error::InvalidInput(
                "expiring_ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.expiring_ttl_hours > MAX_EXPIRING_TTL_HOURS {
            return Err(Error::InvalidInput(format!(
                "expiring_ttl_hours must be at most {}",
                MAX_EXPIRING_TTL_HOURS
            )));
        }
        Ok(())
    }

    /// Countdown timer period.
    pub fn countdown_tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.countdown_tick_ms)
    }

    /// Lifetime of an expiring link.
    pub fn expiring_lifetime(&self) -> Duration {
        Duration::hours(i64::from(self.expiring_ttl_hours))
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_valid() {
        let config = ShareConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.transport_warn_bytes, 150_000);
        assert_eq!(config.expiring_lifetime(), Duration::hours(24));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ShareConfig {
            kdf: KdfAlgorithm::Argon2id,
            max_attempts: 5,
            ..ShareConfig::default()
        };

        let restored = ShareConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ShareConfig::from_json(r#"{"kdf": "argon2id"}"#).unwrap();

        assert_eq!(config.kdf, KdfAlgorithm::Argon2id);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ShareConfig::from_json(r#"{"max_attempts": 0}"#).is_err());
        assert!(ShareConfig::from_json(r#"{"base_url": "not a url"}"#).is_err());
        assert!(ShareConfig::from_json(r#"{"countdown_tick_ms": 0}"#).is_err());
        assert!(ShareConfig::from_json("{").is_err());
    }

    #[test]
    fn test_expiring_lifetime_bounded() {
        let year = ShareConfig::from_json(r#"{"expiring_ttl_hours": 8760}"#).unwrap();
        assert_eq!(year.expiring_lifetime(), Duration::hours(8760));

        let result = ShareConfig::from_json(r#"{"expiring_ttl_hours": 4294967295}"#);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(ShareConfig::from_json(r#"{"expiring_ttl_hours": 8761}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"base_url": "https://share.example/open", "max_attempts": 4}}"#).unwrap();

        let config = ShareConfig::load(file.path()).unwrap();
        assert_eq!(config.base_url, "https://share.example/open");
        assert_eq!(config.max_attempts, 4);
    }
}
