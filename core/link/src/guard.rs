//! Attempt guard: local lockout after repeated wrong passcodes.
//!
//! Scope is one opened link. It is a deterrent against guessing inside one
//! session, not a security boundary, and is never persisted.

/// Default number of consecutive failures that locks a link.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptGuard {
    failures: u32,
    threshold: u32,
}

impl AttemptGuard {
    /// Create a guard that locks after `threshold` consecutive failures.
    ///
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record one failed attempt and return the new failure count.
    pub fn record_failure(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    /// Reset the count after a successful attempt.
    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    pub fn is_locked(&self) -> bool {
        self.failures >= self.threshold
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Attempts left before lockout.
    pub fn remaining(&self) -> u32 {
        self.threshold.saturating_sub(self.failures)
    }
}

impl Default for AttemptGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks_at_threshold() {
        let mut guard = AttemptGuard::default();

        assert_eq!(guard.record_failure(), 1);
        assert_eq!(guard.record_failure(), 2);
        assert!(!guard.is_locked());
        assert_eq!(guard.remaining(), 1);

        assert_eq!(guard.record_failure(), 3);
        assert!(guard.is_locked());
        assert_eq!(guard.remaining(), 0);
    }

    #[test]
    fn test_success_resets() {
        let mut guard = AttemptGuard::default();
        guard.record_failure();
        guard.record_failure();
        guard.record_success();

        assert_eq!(guard.failures(), 0);
        assert_eq!(guard.remaining(), 3);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let mut guard = AttemptGuard::new(0);
        assert_eq!(guard.threshold(), 1);
        assert!(!guard.is_locked());

        guard.record_failure();
        assert!(guard.is_locked());
    }
}
