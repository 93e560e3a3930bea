//! Live expiry countdown for an open link.
//!
//! A recipient may leave a link open past its deadline, so the deadline is
//! re-checked on a repeating timer rather than once at open time. The timer
//! is aborted when the [`Countdown`] is dropped.

use chrono::Duration;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::lifecycle::LinkState;
use crate::session::LinkSession;

/// Shortest sleep between checks.
const MIN_TICK: std::time::Duration = std::time::Duration::from_millis(1);

/// Published on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownStatus {
    pub state: LinkState,
    /// Time until the deadline; zero once passed.
    pub remaining: Duration,
}

/// Handle to a running countdown task.
#[derive(Debug)]
pub struct Countdown {
    task: JoinHandle<()>,
    status: watch::Receiver<CountdownStatus>,
}

impl Countdown {
    /// Start a countdown for `session`.
    ///
    /// Returns `None` when the link has no deadline, is already terminal, or
    /// no Tokio runtime is available to run the timer.
    pub fn start(session: &Arc<LinkSession>, tick: std::time::Duration) -> Option<Self> {
        let (state, remaining) = session.status();
        let remaining = remaining?;
        if state.is_terminal() {
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(session = %session.handle(), "No runtime available; countdown not started");
                return None;
            }
        };

        let (tx, rx) = watch::channel(CountdownStatus { state, remaining });
        let weak = Arc::downgrade(session);
        let task = runtime.spawn(run(weak, tx, tick.max(MIN_TICK)));

        debug!(session = %session.handle(), "Countdown started");
        Some(Self { task, status: rx })
    }

    /// Latest published status.
    pub fn status(&self) -> CountdownStatus {
        *self.status.borrow()
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<CountdownStatus> {
        self.status.clone()
    }

    /// Whether the timer has stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the timer.
    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    session: Weak<LinkSession>,
    tx: watch::Sender<CountdownStatus>,
    tick: std::time::Duration,
) {
    loop {
        // Sleep a full tick, or just to the deadline if that is sooner.
        let wait = tx
            .borrow()
            .remaining
            .to_std()
            .map(|left| left.min(tick))
            .unwrap_or(tick)
            .max(MIN_TICK);
        tokio::time::sleep(wait).await;

        let Some(session) = session.upgrade() else {
            break;
        };
        let (state, remaining) = session.status();
        tx.send_replace(CountdownStatus {
            state,
            remaining: remaining.unwrap_or_else(Duration::zero),
        });

        if state.is_terminal() {
            debug!(session = %session.handle(), state = %state, "Countdown finished");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShareConfig;
    use crate::envelope::Content;
    use crate::policy::LinkPolicy;
    use crate::sender::seal;
    use crate::testing::fast_provider;
    use burnlink_common::Passcode;
    use chrono::Utc;

    async fn open(policy: LinkPolicy) -> Arc<LinkSession> {
        let provider = fast_provider();
        let config = ShareConfig::default();
        let sealed = seal(
            Content::Text("tick".into()),
            Passcode::new("pw").unwrap(),
            policy,
            &config,
            provider.clone(),
        )
        .await
        .unwrap();
        Arc::new(LinkSession::open(&sealed.url, &config, provider).unwrap())
    }

    #[tokio::test]
    async fn test_no_countdown_without_deadline() {
        let session = open(LinkPolicy::never()).await;
        assert!(Countdown::start(&session, std::time::Duration::from_millis(10)).is_none());
    }

    #[tokio::test]
    async fn test_countdown_expires_link_without_action() {
        let session = open(LinkPolicy::expiring_in(Duration::milliseconds(300), Utc::now())).await;
        let countdown = Countdown::start(&session, std::time::Duration::from_millis(20)).unwrap();
        let mut status = countdown.subscribe();

        assert_eq!(countdown.status().state, LinkState::Valid);

        let expired = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            status.wait_for(|s| s.state == LinkState::Expired),
        )
        .await
        .map(|seen| seen.is_ok())
        .unwrap_or(false);
        assert!(expired);

        let view = session.view();
        assert_eq!(view.state, LinkState::Expired);
        assert_eq!(view.address, "https://burnlink.local/");
    }

    #[tokio::test]
    async fn test_cancel_stops_updates() {
        let session = open(LinkPolicy::expiring_in(Duration::hours(1), Utc::now())).await;
        let countdown = Countdown::start(&session, std::time::Duration::from_millis(5)).unwrap();
        let status = countdown.subscribe();

        countdown.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        assert!(status.has_changed().is_err());
    }
}
