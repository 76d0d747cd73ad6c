//! Sticking session record and its teardown token.

use crate::listeners::ListenerHandle;
use crate::model::{ChannelId, FrameLocator, RequestId};
use crate::pattern::UrlPattern;

pub type SessionId = u64;

/// How the session came to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Armed by the decision engine right before redirecting to the viewer.
    Redirect { request_id: RequestId },
    /// Requested by the viewer over a `set-referer` channel.
    ViewerHandshake { channel_id: ChannelId },
}

/// Listener-backed conditions a session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Waiting for the viewer's alive channel.
    AliveHandshake,
    TabClosed,
    NavigatedAway,
    ConnectionDropped,
    /// The scoped before-send rule that rewrites the referer.
    HeaderInjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    ConnectionDropped,
    TabClosed,
    NavigatedAway,
    /// A request carried a referer this engine did not set.
    ForeignReferer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Armed, viewer has not confirmed it is alive yet.
    AwaitingAlive,
    /// Armed and bound to a live viewer channel.
    Live,
}

/// First-wins cancellation token.
#[derive(Debug, Default)]
pub struct TeardownToken(Option<TeardownReason>);

impl TeardownToken {
    /// Signal teardown; only the first call returns true.
    pub fn signal(&mut self, reason: TeardownReason) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(reason);
        true
    }

    pub fn reason(&self) -> Option<TeardownReason> {
        self.0
    }

    pub fn is_signalled(&self) -> bool {
        self.0.is_some()
    }
}

#[derive(Debug)]
pub struct StickingSession {
    pub id: SessionId,
    pub origin: SessionOrigin,
    pub locator: FrameLocator,
    pub pattern: UrlPattern,
    pub referer: String,
    pub state: SessionState,
    pub token: TeardownToken,
    triggers: Vec<(Trigger, ListenerHandle)>,
}

impl StickingSession {
    pub fn new(
        id: SessionId,
        origin: SessionOrigin,
        locator: FrameLocator,
        pattern: UrlPattern,
        referer: String,
        state: SessionState,
    ) -> Self {
        Self {
            id,
            origin,
            locator,
            pattern,
            referer,
            state,
            token: TeardownToken::default(),
            triggers: Vec::new(),
        }
    }

    pub fn add_trigger(&mut self, trigger: Trigger, handle: ListenerHandle) {
        self.triggers.push((trigger, handle));
    }

    /// Detach one trigger, returning its handle for unregistration.
    pub fn take_trigger(&mut self, trigger: Trigger) -> Option<ListenerHandle> {
        let index = self.triggers.iter().position(|(t, _)| *t == trigger)?;
        Some(self.triggers.remove(index).1)
    }

    /// Detach every trigger.
    pub fn take_all_triggers(&mut self) -> Vec<ListenerHandle> {
        self.triggers.drain(..).map(|(_, handle)| handle).collect()
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.triggers.iter().map(|(t, _)| *t).collect()
    }
}
