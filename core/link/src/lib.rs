//! Passcode-protected share links.
//!
//! This module provides:
//! - Payload framing (`salt || nonce || ciphertext+tag`)
//! - The link codec mapping payload, policy and envelope metadata to a
//!   URL query string
//! - The link lifecycle state machine (never-expire, burn, one-time, 24h)
//! - A per-link attempt guard that locks after repeated wrong passcodes
//! - Sealing on the sender side and link sessions on the recipient side
//!
//! # Architecture
//! Sender: derive key, encrypt, frame, encode, display.
//! Recipient: decode, lifecycle check, guard check, derive key, decrypt,
//! unwrap the envelope. Nothing is stored anywhere but in the link.

pub mod codec;
pub mod config;
pub mod countdown;
pub mod envelope;
pub mod frame;
pub mod guard;
pub mod lifecycle;
pub mod policy;
pub mod sender;
pub mod session;
pub mod viewer;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use codec::{decode, encode, DecodedLink, LinkFields, TransportWarning};
pub use config::ShareConfig;
pub use countdown::{Countdown, CountdownStatus};
pub use envelope::{Content, ContentKind, EnvelopeMeta, MediaFile};
pub use frame::Payload;
pub use guard::AttemptGuard;
pub use lifecycle::{Lifecycle, LinkState};
pub use policy::{LinkPolicy, Ttl};
pub use sender::{seal, share_url, SealedLink};
pub use session::{LinkSession, LinkView, SessionHandle};
pub use viewer::Viewer;
