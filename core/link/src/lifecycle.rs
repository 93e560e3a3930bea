//! Link lifecycle state machine.
//!
//! ```text
//! FRESH --check--> VALID --decrypt ok, burn/1--> CONSUMED
//!   |                |  \--decrypt ok, none/24h--> VALID
//!   |                \--deadline passes--> EXPIRED
//!   \--check, deadline passed--> EXPIRED
//! any non-terminal --lockout--> CONSUMED
//! ```
//!
//! `EXPIRED` and `CONSUMED` are terminal. Time is always passed in so the
//! machine itself never reads a clock.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::policy::LinkPolicy;

/// State of one opened link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Just decoded, policy not yet checked.
    Fresh,
    /// May be decrypted.
    Valid,
    /// Deadline passed.
    Expired,
    /// Burned by a successful read or by lockout.
    Consumed,
}

impl LinkState {
    /// Whether no further decryption may be attempted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Expired | LinkState::Consumed)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkState::Fresh => "fresh",
            LinkState::Valid => "valid",
            LinkState::Expired => "expired",
            LinkState::Consumed => "consumed",
        })
    }
}

/// Policy-driven transitions for one link instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    policy: LinkPolicy,
    state: LinkState,
}

impl Lifecycle {
    pub fn new(policy: LinkPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Fresh,
        }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Evaluate the policy at `now`.
    ///
    /// Moves `Fresh` to `Valid` or `Expired`, and `Valid` to `Expired` once
    /// the deadline passes. Terminal states are left alone.
    pub fn check(&mut self, now: DateTime<Utc>) -> LinkState {
        if !self.state.is_terminal() {
            self.state = if self.policy.is_expired_at(now) {
                LinkState::Expired
            } else {
                LinkState::Valid
            };
        }
        self.state
    }

    /// Apply a successful decrypt.
    ///
    /// Burn and one-time links become `Consumed`; others stay `Valid`.
    pub fn on_decrypted(&mut self) -> LinkState {
        if !self.state.is_terminal() {
            self.state = if self.policy.ttl().consumes_on_read() {
                LinkState::Consumed
            } else {
                LinkState::Valid
            };
        }
        self.state
    }

    /// Apply an attempt-guard lockout. Treated the same as a burn.
    pub fn on_locked(&mut self) -> LinkState {
        if self.state != LinkState::Expired {
            self.state = LinkState::Consumed;
        }
        self.state
    }
}
