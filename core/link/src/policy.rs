//! Link policy: how long a link stays usable.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use burnlink_common::{Error, Result};

/// Time-to-live mode of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Reusable until the link is discarded.
    #[default]
    None,
    /// Consumed by the first successful decrypt.
    Burn,
    /// One-time view. Same semantics as `Burn`.
    OneTime,
    /// Reusable until `expires_at`.
    Expiring,
}

impl Ttl {
    /// Wire name used in the `ttl` link field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ttl::None => "none",
            Ttl::Burn => "burn",
            Ttl::OneTime => "1",
            Ttl::Expiring => "24h",
        }
    }

    /// Whether a successful decrypt consumes the link.
    pub fn consumes_on_read(&self) -> bool {
        matches!(self, Ttl::Burn | Ttl::OneTime)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ttl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(Ttl::None),
            "burn" => Ok(Ttl::Burn),
            "1" => Ok(Ttl::OneTime),
            "24h" => Ok(Ttl::Expiring),
            other => Err(Error::InvalidPolicy(format!("unknown ttl: {}", other))),
        }
    }
}

/// Validity policy attached to a link at seal time.
///
/// Invariant: `expires_at` is present iff `ttl` is `Expiring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    ttl: Ttl,
    expires_at: Option<DateTime<Utc>>,
}

impl LinkPolicy {
    /// Validate and build a policy.
    ///
    /// # Errors
    /// - `InvalidPolicy` if `expires_at` is given without `Ttl::Expiring`
    ///   or missing with it
    pub fn new(ttl: Ttl, expires_at: Option<DateTime<Utc>>) -> Result<Self> {
        match (ttl, expires_at) {
            (Ttl::Expiring, None) => Err(Error::InvalidPolicy(
                "ttl=24h requires an expiry timestamp".to_string(),
            )),
            (Ttl::Expiring, Some(deadline)) => Ok(Self::expiring_at(deadline)),
            (_, None) => Ok(Self { ttl, expires_at }),
            (other, Some(_)) => Err(Error::InvalidPolicy(format!(
                "ttl={} does not take an expiry timestamp",
                other
            ))),
        }
    }

    /// Reusable, never expires.
    pub fn never() -> Self {
        Self {
            ttl: Ttl::None,
            expires_at: None,
        }
    }

    /// Consumed on first successful decrypt.
    pub fn burn() -> Self {
        Self {
            ttl: Ttl::Burn,
            expires_at: None,
        }
    }

    /// One-time view.
    pub fn one_time() -> Self {
        Self {
            ttl: Ttl::OneTime,
            expires_at: None,
        }
    }

    /// Reusable until `expires_at`, truncated to the millisecond precision
    /// the link carries.
    pub fn expiring_at(expires_at: DateTime<Utc>) -> Self {
        let truncated =
            DateTime::from_timestamp_millis(expires_at.timestamp_millis()).unwrap_or(expires_at);
        Self {
            ttl: Ttl::Expiring,
            expires_at: Some(truncated),
        }
    }

    /// Reusable for `lifetime` from `now`. A deadline past the representable
    /// range is clamped to the latest instant.
    pub fn expiring_in(lifetime: Duration, now: DateTime<Utc>) -> Self {
        Self::expiring_at(
            now.checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }

    /// Build the policy a sender asked for by TTL name.
    ///
    /// `lifetime` applies only to `Ttl::Expiring`.
    pub fn for_ttl(ttl: Ttl, lifetime: Duration, now: DateTime<Utc>) -> Self {
        match ttl {
            Ttl::None => Self::never(),
            Ttl::Burn => Self::burn(),
            Ttl::OneTime => Self::one_time(),
            Ttl::Expiring => Self::expiring_in(lifetime, now),
        }
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the deadline has passed at `now`. Always false without one.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }

    /// Time left before the deadline, if the policy has one.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_requires_timestamp() {
        assert!(LinkPolicy::new(Ttl::Expiring, None).is_err());
        assert!(LinkPolicy::new(Ttl::Expiring, Some(Utc::now())).is_ok());
    }

    #[test]
    fn test_timestamp_only_with_expiry() {
        assert!(LinkPolicy::new(Ttl::Burn, Some(Utc::now())).is_err());
        assert!(LinkPolicy::new(Ttl::None, None).is_ok());
    }

    #[test]
    fn test_ttl_wire_names() {
        for ttl in [Ttl::None, Ttl::Burn, Ttl::OneTime, Ttl::Expiring] {
            assert_eq!(ttl.as_str().parse::<Ttl>().unwrap(), ttl);
        }
        assert_eq!("".parse::<Ttl>().unwrap(), Ttl::None);
        assert!(matches!("7d".parse::<Ttl>(), Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn test_burn_and_one_time_consume() {
        assert!(Ttl::Burn.consumes_on_read());
        assert!(Ttl::OneTime.consumes_on_read());
        assert!(!Ttl::None.consumes_on_read());
        assert!(!Ttl::Expiring.consumes_on_read());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let policy = LinkPolicy::expiring_at(now);

        assert!(policy.is_expired_at(now));
        assert!(!policy.is_expired_at(now - Duration::milliseconds(1)));
        assert_eq!(policy.remaining_at(now + Duration::seconds(5)), Some(Duration::zero()));
    }

    #[test]
    fn test_expiring_in_saturates() {
        let policy = LinkPolicy::expiring_in(Duration::hours(i64::from(u32::MAX)), Utc::now());

        assert_eq!(policy.ttl(), Ttl::Expiring);
        let deadline = policy.expires_at().unwrap();
        assert!(deadline > Utc::now() + Duration::days(365));
        assert!(!policy.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_for_ttl() {
        let now = Utc::now();
        let policy = LinkPolicy::for_ttl(Ttl::Expiring, Duration::hours(24), now);

        assert_eq!(policy.ttl(), Ttl::Expiring);
        assert_eq!(
            policy.expires_at().map(|t| t.timestamp_millis()),
            Some((now + Duration::hours(24)).timestamp_millis())
        );
        assert_eq!(LinkPolicy::for_ttl(Ttl::Burn, Duration::hours(24), now), LinkPolicy::burn());
        assert!(!LinkPolicy::never().is_expired_at(now));
    }
}
