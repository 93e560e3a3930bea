//! Recipient-side page model.
//!
//! A [`Viewer`] holds at most one open link. Opening another link replaces
//! it: the old countdown is cancelled before the new session and countdown
//! are created, so a stale timer never touches the replacement.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::ShareConfig;
use crate::countdown::{Countdown, CountdownStatus};
use crate::envelope::Content;
use crate::session::{LinkSession, LinkView};
use burnlink_common::{Error, Result};
use burnlink_crypto::CryptoProvider;

struct OpenLink {
    // Declared first so it is dropped, and its task aborted, before the
    // session goes away.
    countdown: Option<Countdown>,
    session: Arc<LinkSession>,
}

pub struct Viewer {
    config: ShareConfig,
    provider: Arc<dyn CryptoProvider>,
    current: Option<OpenLink>,
}

impl Viewer {
    pub fn new(config: ShareConfig, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            config,
            provider,
            current: None,
        }
    }

    /// Open `link`, replacing whatever was open.
    ///
    /// The previous link is closed even when `link` fails to parse.
    pub fn open(&mut self, link: &str) -> Result<LinkView> {
        self.close();

        let session = Arc::new(LinkSession::open(link, &self.config, self.provider.clone())?);
        let countdown = Countdown::start(&session, self.config.countdown_tick());
        let view = session.view();

        self.current = Some(OpenLink { countdown, session });
        Ok(view)
    }

    /// Try the currently open link with `passcode`.
    pub async fn attempt(&self, passcode: &str) -> Result<Content> {
        let session = self
            .session()
            .cloned()
            .ok_or_else(|| Error::MissingPayload("no link is open".to_string()))?;
        session.attempt(passcode).await
    }

    /// Snapshot of the open link.
    pub fn view(&self) -> Option<LinkView> {
        self.current.as_ref().map(|open| open.session.view())
    }

    pub fn session(&self) -> Option<&Arc<LinkSession>> {
        self.current.as_ref().map(|open| &open.session)
    }

    /// Countdown updates for the open link, when it has a deadline.
    pub fn countdown(&self) -> Option<watch::Receiver<CountdownStatus>> {
        self.current
            .as_ref()
            .and_then(|open| open.countdown.as_ref())
            .map(Countdown::subscribe)
    }

    /// Close the open link, cancelling its countdown first.
    pub fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            if let Some(countdown) = open.countdown.take() {
                countdown.cancel();
            }
            debug!(session = %open.session.handle(), "Closed link");
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.close();
    }
}
