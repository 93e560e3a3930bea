//! Link sessions.
//!
//! A session is one opened link: its decoded payload, lifecycle and attempt
//! guard. Each open creates a fresh session; nothing is shared between them.
//! Once a link is expired, burned or locked the payload is dropped and the
//! address is scrubbed down to its origin so it cannot be offered again.

use chrono::{Duration, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::codec::{self, TransportWarning};
use crate::config::ShareConfig;
use crate::envelope::{Content, EnvelopeMeta};
use crate::frame::Payload;
use crate::guard::AttemptGuard;
use crate::lifecycle::{Lifecycle, LinkState};
use crate::policy::LinkPolicy;
use burnlink_common::{Error, Passcode, Result};
use burnlink_crypto::{CryptoProvider, KdfAlgorithm};

/// Session handle for tracking opened links in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unique session handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkView {
    pub handle: SessionHandle,
    pub state: LinkState,
    pub policy: LinkPolicy,
    pub meta: EnvelopeMeta,
    pub kdf: KdfAlgorithm,
    /// Consecutive failed attempts so far.
    pub failures: u32,
    /// Attempts left before lockout.
    pub attempts_remaining: u32,
    /// Time until the deadline, for expiring links.
    pub time_remaining: Option<Duration>,
    pub warning: Option<TransportWarning>,
    /// Current address; scrubbed once the link is terminal.
    pub address: String,
}

/// Mutable part of a session.
struct SessionState {
    lifecycle: Lifecycle,
    guard: AttemptGuard,
    payload: Option<Payload>,
    address: String,
    scrubbed_address: String,
}

impl SessionState {
    fn scrub(&mut self) {
        self.payload = None;
        self.address = self.scrubbed_address.clone();
    }

    /// Re-check the deadline, scrubbing if the link just became terminal.
    fn refresh(&mut self) -> LinkState {
        let state = self.lifecycle.check(Utc::now());
        if state.is_terminal() && self.payload.is_some() {
            self.scrub();
        }
        state
    }

    /// Fail unless a decrypt may be attempted right now.
    fn ensure_open(&mut self) -> Result<()> {
        if self.guard.is_locked() {
            return Err(locked_error(&self.guard));
        }
        match self.refresh() {
            LinkState::Expired => Err(Error::Expired("link has expired".to_string())),
            LinkState::Consumed => Err(Error::Expired("link has already been used".to_string())),
            LinkState::Fresh | LinkState::Valid => Ok(()),
        }
    }
}

fn locked_error(guard: &AttemptGuard) -> Error {
    Error::Locked(format!(
        "{} failed attempts; open a fresh link to try again",
        guard.failures()
    ))
}

/// Clears the in-flight flag when an attempt finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One opened link.
pub struct LinkSession {
    handle: SessionHandle,
    meta: EnvelopeMeta,
    kdf: KdfAlgorithm,
    warning: Option<TransportWarning>,
    provider: Arc<dyn CryptoProvider>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl LinkSession {
    /// Open a link from a full URL or a bare query string.
    ///
    /// The policy is checked immediately; an already-expired link opens in
    /// the `Expired` state with its payload scrubbed.
    ///
    /// # Errors
    /// - `MissingPayload`, `MalformedPayload` or `InvalidPolicy` when the
    ///   link cannot be parsed
    pub fn open(
        link: &str,
        config: &ShareConfig,
        provider: Arc<dyn CryptoProvider>,
    ) -> Result<Self> {
        let (query, address, scrubbed_address) = split_link(link);
        let decoded = codec::decode(&query, config.transport_warn_bytes)?;
        let payload = Payload::unpack(&decoded.payload)?;

        let handle = SessionHandle::new();
        let mut state = SessionState {
            lifecycle: Lifecycle::new(decoded.fields.policy),
            guard: AttemptGuard::new(config.max_attempts),
            payload: Some(payload),
            address,
            scrubbed_address,
        };
        let initial = state.refresh();

        info!(
            session = %handle,
            ttl = %decoded.fields.policy.ttl(),
            kind = %decoded.fields.meta.kind,
            state = %initial,
            "Opened link"
        );

        Ok(Self {
            handle,
            meta: decoded.fields.meta,
            kdf: decoded.fields.kdf,
            warning: decoded.warning,
            provider,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn meta(&self) -> &EnvelopeMeta {
        &self.meta
    }

    /// Whether a decrypt attempt is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-check the deadline and return the current state.
    pub fn refresh(&self) -> LinkState {
        let mut state = self.lock_state();
        let before = state.lifecycle.state();
        let after = state.refresh();
        if before != after && after == LinkState::Expired {
            info!(session = %self.handle, "Link expired");
        }
        after
    }

    /// Current state and time left, after re-checking the deadline.
    pub fn status(&self) -> (LinkState, Option<Duration>) {
        let mut state = self.lock_state();
        let current = state.refresh();
        let remaining = state.lifecycle.policy().remaining_at(Utc::now());
        (current, remaining)
    }

    /// Snapshot for display.
    pub fn view(&self) -> LinkView {
        let mut state = self.lock_state();
        let current = state.refresh();
        let policy = *state.lifecycle.policy();

        LinkView {
            handle: self.handle.clone(),
            state: current,
            policy,
            meta: self.meta.clone(),
            kdf: self.kdf,
            failures: state.guard.failures(),
            attempts_remaining: state.guard.remaining(),
            time_remaining: policy.remaining_at(Utc::now()),
            warning: self.warning,
            address: state.address.clone(),
        }
    }

    /// Try to decrypt the link with `passcode`.
    ///
    /// Overlapping calls are refused with `Busy` without touching the
    /// attempt guard. A wrong passcode counts as one failure; the failure
    /// that reaches the limit returns `Locked` and scrubs the link.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty passcode (not counted)
    /// - `Authentication` for a wrong passcode or corrupted payload
    /// - `Locked` once the attempt limit is reached
    /// - `Expired` once the link has expired or been burned
    /// - `Busy` while another attempt is running
    pub async fn attempt(&self, passcode: &str) -> Result<Content> {
        let _in_flight = InFlight::acquire(&self.in_flight)
            .ok_or_else(|| Error::Busy("a decrypt attempt is already running".to_string()))?;
        let passcode = Passcode::new(passcode)?;

        let payload = {
            let mut state = self.lock_state();
            state.ensure_open()?;
            state
                .payload
                .clone()
                .ok_or_else(|| Error::Expired("link payload has been cleared".to_string()))?
        };

        let provider = self.provider.clone();
        let params = self.kdf.params();
        let outcome = tokio::task::spawn_blocking(move || {
            let key = provider.derive(&passcode, &payload.salt, &params)?;
            provider.open(&key, &payload.nonce, &payload.ciphertext)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Decrypt task failed: {}", e)))?;

        let mut state = self.lock_state();
        // The deadline may have passed while the key was being derived.
        if state.refresh() == LinkState::Expired {
            return Err(Error::Expired("link expired during decryption".to_string()));
        }

        match outcome {
            Ok(plaintext) => {
                state.guard.record_success();
                if state.lifecycle.on_decrypted() == LinkState::Consumed {
                    state.scrub();
                    info!(session = %self.handle, "Link burned after successful read");
                } else {
                    debug!(session = %self.handle, "Link decrypted");
                }
                drop(state);
                Content::from_plaintext(&self.meta, plaintext)
            }
            Err(Error::Authentication) => {
                let failures = state.guard.record_failure();
                if state.guard.is_locked() {
                    state.lifecycle.on_locked();
                    state.scrub();
                    warn!(session = %self.handle, failures, "Link locked after repeated failures");
                    Err(locked_error(&state.guard))
                } else {
                    debug!(session = %self.handle, failures, "Wrong passcode");
                    Err(Error::Authentication)
                }
            }
            Err(other) => Err(other),
        }
    }
}

impl fmt::Debug for LinkSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSession")
            .field("handle", &self.handle)
            .field("meta", &self.meta)
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}

/// Split a link into (query, address, scrubbed address).
///
/// A full URL keeps its origin and path as the scrubbed address. The query
/// is preferred; a fragment is used when there is no query. Anything that
/// does not parse as a URL is treated as a bare query string.
fn split_link(link: &str) -> (String, String, String) {
    let link = link.trim();
    match Url::parse(link) {
        Ok(url) => {
            let query = url
                .query()
                .filter(|q| !q.is_empty())
                .or_else(|| url.fragment())
                .unwrap_or_default()
                .to_string();
            let mut scrubbed = url.clone();
            scrubbed.set_query(None);
            scrubbed.set_fragment(None);
            (query, url.to_string(), scrubbed.to_string())
        }
        Err(_) => (link.to_string(), link.to_string(), String::new()),
    }
}
