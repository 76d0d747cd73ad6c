//! Referer Sticking Engine.
//!
//! A sticking session rewrites the `Referer` of the viewer's follow-up fetch
//! of one resource, in one tab and one frame. Each session owns the listeners
//! it registered and releases all of them in a single teardown:
//!
//! - `Armed` starts when the scoped header-injection rule is registered.
//! - `Torn-down` is reached on the first of: the viewer channel closing, the
//!   tab closing, navigation in the frame (or the tab's main frame) before the
//!   viewer confirmed it is alive, or a request whose referer this engine did
//!   not set.
//!
//! Later triggers find neither the session nor its listeners.

mod handshake;
mod session;

pub use handshake::{parse_channel_name, RefererHandshake};
pub use session::{
    SessionId, SessionOrigin, SessionState, StickingSession, TeardownReason, TeardownToken,
    Trigger,
};

use std::collections::HashMap;

use crate::events::{Action, ChannelSender};
use crate::headers::{HeaderSet, REFERER};
use crate::listeners::{ListenerFilter, ListenerKind, ListenerOwner, ListenerRegistry};
use crate::model::{
    ChannelId, FrameId, FrameLocator, RequestDetails, RequestId, ResourceType, TabId,
    MAIN_FRAME_ID,
};
use crate::pattern::UrlPattern;
use crate::viewer_url::ViewerUrl;

#[derive(Debug)]
pub struct RefererSticker {
    viewer: ViewerUrl,
    alive_channel: String,
    referer_channel_prefix: String,
    sessions: HashMap<SessionId, StickingSession>,
    next_session: SessionId,
}

impl RefererSticker {
    pub fn new(viewer: ViewerUrl, alive_channel: &str, referer_channel_prefix: &str) -> Self {
        Self {
            viewer,
            alive_channel: alive_channel.to_string(),
            referer_channel_prefix: referer_channel_prefix.to_string(),
            sessions: HashMap::new(),
            next_session: 0,
        }
    }

    /// Arm a session for the viewer's fetch of `resource_url` in `locator`.
    ///
    /// Called before the redirect is returned, so the rule exists before the
    /// viewer can issue its request.
    pub fn arm_for_redirect(
        &mut self,
        registry: &mut ListenerRegistry,
        request_id: &RequestId,
        locator: FrameLocator,
        resource_url: &str,
        referer: &str,
    ) -> SessionId {
        self.next_session += 1;
        let id = self.next_session;
        let owner = ListenerOwner::Session(id);
        let tab = locator.tab_id;
        let pattern = UrlPattern::exact(resource_url);

        let mut session = StickingSession::new(
            id,
            SessionOrigin::Redirect {
                request_id: request_id.clone(),
            },
            locator,
            pattern.clone(),
            referer.to_string(),
            SessionState::AwaitingAlive,
        );
        session.add_trigger(
            Trigger::AliveHandshake,
            registry.register(ListenerKind::ChannelOpened, ListenerFilter::any().tab(tab), owner),
        );
        session.add_trigger(
            Trigger::TabClosed,
            registry.register(ListenerKind::TabRemoved, ListenerFilter::any().tab(tab), owner),
        );
        session.add_trigger(
            Trigger::NavigatedAway,
            registry.register(ListenerKind::BeforeNavigate, ListenerFilter::any().tab(tab), owner),
        );
        session.add_trigger(
            Trigger::HeaderInjection,
            registry.register(
                ListenerKind::BeforeSendHeaders,
                injection_filter(pattern, tab),
                owner,
            ),
        );

        tracing::debug!(
            session = id,
            %request_id,
            tab_id = locator.tab_id,
            frame_id = locator.frame_id,
            url = resource_url,
            "referer session armed for redirect"
        );
        self.sessions.insert(id, session);
        id
    }

    /// Handle a channel opened by a viewer asking for a referer rule.
    ///
    /// Channels that are not handshakes produce no actions. Broken or
    /// unattributable handshakes are disconnected without arming anything.
    pub fn on_viewer_channel(
        &mut self,
        registry: &mut ListenerRegistry,
        channel_id: ChannelId,
        name: &str,
        sender: &ChannelSender,
    ) -> Vec<Action> {
        let Some(parsed) = parse_channel_name(name, &self.referer_channel_prefix) else {
            return Vec::new();
        };
        let disconnect = vec![Action::DisconnectChannel { channel_id }];

        let Some(frame_id) = sender.frame_id else {
            tracing::warn!(
                channel_id,
                tab_id = sender.tab_id,
                "referer handshake without frame id"
            );
            return disconnect;
        };
        let handshake = match parsed {
            Ok(handshake) => handshake,
            Err(e) => {
                tracing::warn!(channel_id, "rejected referer handshake: {}", e);
                return disconnect;
            }
        };
        if handshake.referer.is_empty() {
            tracing::debug!(channel_id, "referer handshake with empty referer");
            return disconnect;
        }
        let pattern = match UrlPattern::parse(&handshake.url) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(channel_id, "rejected referer handshake: {}", e);
                return disconnect;
            }
        };

        self.next_session += 1;
        let id = self.next_session;
        let owner = ListenerOwner::Session(id);
        let locator = FrameLocator::new(sender.tab_id, frame_id);
        let mut session = StickingSession::new(
            id,
            SessionOrigin::ViewerHandshake { channel_id },
            locator,
            pattern.clone(),
            handshake.referer,
            SessionState::Live,
        );
        session.add_trigger(
            Trigger::HeaderInjection,
            registry.register(
                ListenerKind::BeforeSendHeaders,
                injection_filter(pattern, locator.tab_id),
                owner,
            ),
        );
        session.add_trigger(
            Trigger::ConnectionDropped,
            registry.register(
                ListenerKind::ChannelClosed,
                ListenerFilter::any().channel(channel_id),
                owner,
            ),
        );

        tracing::debug!(
            session = id,
            channel_id,
            tab_id = locator.tab_id,
            frame_id,
            url = %session.pattern,
            "referer session armed by viewer"
        );
        self.sessions.insert(id, session);
        vec![Action::AcknowledgeChannel { channel_id }]
    }

    /// Alive handshake: swap the coarse triggers for the channel-closed one.
    pub fn on_channel_opened(
        &mut self,
        registry: &mut ListenerRegistry,
        id: SessionId,
        channel_id: ChannelId,
        name: &str,
        sender: &ChannelSender,
    ) {
        if name != self.alive_channel {
            return;
        }
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if session.token.is_signalled() || session.state != SessionState::AwaitingAlive {
            return;
        }
        if sender.tab_id != session.locator.tab_id
            || sender.frame_id != Some(session.locator.frame_id)
        {
            return;
        }

        session.add_trigger(
            Trigger::ConnectionDropped,
            registry.register(
                ListenerKind::ChannelClosed,
                ListenerFilter::any().channel(channel_id),
                ListenerOwner::Session(id),
            ),
        );
        for trigger in [Trigger::AliveHandshake, Trigger::NavigatedAway] {
            if let Some(handle) = session.take_trigger(trigger) {
                registry.unregister(handle);
            }
        }
        session.state = SessionState::Live;
        tracing::debug!(session = id, channel_id, "viewer alive, session bound to channel");
    }

    pub fn on_tab_removed(
        &mut self,
        registry: &mut ListenerRegistry,
        id: SessionId,
        tab_id: TabId,
    ) {
        let matches = self
            .sessions
            .get(&id)
            .is_some_and(|s| s.locator.tab_id == tab_id);
        if matches {
            self.teardown(registry, id, TeardownReason::TabClosed);
        }
    }

    pub fn on_before_navigate(
        &mut self,
        registry: &mut ListenerRegistry,
        id: SessionId,
        tab_id: TabId,
        frame_id: FrameId,
    ) {
        let matches = self.sessions.get(&id).is_some_and(|s| {
            s.locator.tab_id == tab_id
                && (frame_id == s.locator.frame_id || frame_id == MAIN_FRAME_ID)
        });
        if matches {
            self.teardown(registry, id, TeardownReason::NavigatedAway);
        }
    }

    pub fn on_channel_closed(&mut self, registry: &mut ListenerRegistry, id: SessionId) {
        self.teardown(registry, id, TeardownReason::ConnectionDropped);
    }

    /// Scoped header injection.
    ///
    /// The foreign-referer check looks at `inbound`, the headers as the
    /// browser sent them, so a referer written by another session on the same
    /// frame is never mistaken for a foreign one. The rewrite goes to
    /// `outgoing`. Returns true if `outgoing` was modified.
    pub fn on_before_send_headers(
        &mut self,
        registry: &mut ListenerRegistry,
        id: SessionId,
        request: &RequestDetails,
        inbound: &HeaderSet,
        outgoing: &mut HeaderSet,
    ) -> bool {
        let Some(session) = self.sessions.get(&id) else {
            return false;
        };
        if session.token.is_signalled() || request.frame_id != session.locator.frame_id {
            return false;
        }

        if let Some(existing) = inbound.get(REFERER) {
            if !existing.is_empty() && !self.viewer.is_extension_url(existing) {
                tracing::debug!(
                    session = id,
                    request_id = %request.request_id,
                    "request already carries a foreign referer"
                );
                self.teardown(registry, id, TeardownReason::ForeignReferer);
                return false;
            }
        }

        outgoing.set("Referer", session.referer.as_str());
        tracing::trace!(session = id, request_id = %request.request_id, "referer restored");
        true
    }

    /// Tear a session down, releasing every listener it registered.
    /// Returns false if the session was already gone.
    pub fn teardown(
        &mut self,
        registry: &mut ListenerRegistry,
        id: SessionId,
        reason: TeardownReason,
    ) -> bool {
        let Some(mut session) = self.sessions.remove(&id) else {
            return false;
        };
        if !session.token.signal(reason) {
            return false;
        }
        for handle in session.take_all_triggers() {
            registry.unregister(handle);
        }
        tracing::debug!(
            session = id,
            tab_id = session.locator.tab_id,
            frame_id = session.locator.frame_id,
            ?reason,
            "referer session torn down"
        );
        true
    }

    pub fn session(&self, id: SessionId) -> Option<&StickingSession> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn injection_filter(pattern: UrlPattern, tab_id: TabId) -> ListenerFilter {
    ListenerFilter::any()
        .urls([pattern])
        .types([ResourceType::XmlHttpRequest])
        .tab(tab_id)
}
