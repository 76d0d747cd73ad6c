//! Redirect-less fallback for platforms that cannot answer a response with a
//! redirect URL.
//!
//! Top-level loads are cancelled and the tab is navigated. Nested frames can't
//! be cancelled without losing access to them, so their content is suppressed
//! with restrictive headers and the frame is navigated once its load errors out.

use std::collections::HashMap;

use crate::events::{Action, BlockingResponse, InjectionId};
use crate::headers::HeaderSet;
use crate::listeners::{
    ListenerFilter, ListenerHandle, ListenerKind, ListenerOwner, ListenerRegistry,
};
use crate::model::{FrameId, FrameLocator, RequestDetails, TabId};
use crate::pattern::UrlPattern;

/// Headers that stop a frame from rendering the original response.
pub fn suppression_headers() -> HeaderSet {
    HeaderSet::from_pairs([
        ("X-Content-Type-Options", "nosniff"),
        ("X-Frame-Options", "deny"),
    ])
}

/// Script that points a frame at the viewer.
pub fn navigation_script(viewer_url: &str) -> String {
    // A JSON string literal is also a valid JS string literal.
    let literal = serde_json::to_string(viewer_url).unwrap_or_else(|_| format!("{viewer_url:?}"));
    format!("location.href = {literal};")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectionState {
    /// Waiting for the suppressed load to error out.
    AwaitingError,
    /// Script sent; waiting for the host to report whether the frame existed.
    Injected,
}

#[derive(Debug)]
struct PendingInjection {
    locator: FrameLocator,
    viewer_url: String,
    state: InjectionState,
    error_listener: Option<ListenerHandle>,
    /// Held until the script result arrives.
    tab_listener: ListenerHandle,
}

impl PendingInjection {
    fn release(self, registry: &mut ListenerRegistry) {
        if let Some(handle) = self.error_listener {
            registry.unregister(handle);
        }
        registry.unregister(self.tab_listener);
    }
}

/// One-shot frame injections scheduled by the sub-frame fallback.
#[derive(Debug, Default)]
pub struct PendingInjections {
    next_id: InjectionId,
    pending: HashMap<InjectionId, PendingInjection>,
}

impl PendingInjections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback for a top-level load: navigate the tab and cancel the request.
    pub fn main_frame(
        request: &RequestDetails,
        viewer_url: String,
    ) -> (BlockingResponse, Vec<Action>) {
        tracing::debug!(
            request_id = %request.request_id,
            tab_id = request.tab_id,
            "no redirect support, navigating tab to viewer"
        );
        (
            BlockingResponse::Cancel,
            vec![Action::NavigateTab {
                tab_id: request.tab_id,
                url: viewer_url,
            }],
        )
    }

    /// Fallback for a nested frame: suppress rendering and wait for the
    /// frame's navigation error before injecting the viewer.
    pub fn sub_frame(
        &mut self,
        registry: &mut ListenerRegistry,
        request: &RequestDetails,
        viewer_url: String,
    ) -> BlockingResponse {
        self.next_id += 1;
        let id = self.next_id;
        let owner = ListenerOwner::Injection(id);
        let error_listener = registry.register(
            ListenerKind::NavigationError,
            ListenerFilter::any()
                .urls([UrlPattern::exact(&request.url)])
                .tab(request.tab_id),
            owner,
        );
        let tab_listener = registry.register(
            ListenerKind::TabRemoved,
            ListenerFilter::any().tab(request.tab_id),
            owner,
        );
        self.pending.insert(
            id,
            PendingInjection {
                locator: request.locator(),
                viewer_url,
                state: InjectionState::AwaitingError,
                error_listener: Some(error_listener),
                tab_listener,
            },
        );
        tracing::debug!(
            injection = id,
            request_id = %request.request_id,
            tab_id = request.tab_id,
            frame_id = request.frame_id,
            "no redirect support, suppressing frame until its load fails"
        );
        BlockingResponse::ResponseHeaders {
            headers: suppression_headers(),
        }
    }

    /// The suppressed load errored: inject the navigation into its frame.
    pub fn on_navigation_error(
        &mut self,
        registry: &mut ListenerRegistry,
        id: InjectionId,
        tab_id: TabId,
        frame_id: FrameId,
    ) -> Option<Action> {
        let pending = self.pending.get_mut(&id)?;
        if pending.state != InjectionState::AwaitingError
            || pending.locator != FrameLocator::new(tab_id, frame_id)
        {
            return None;
        }
        if let Some(handle) = pending.error_listener.take() {
            registry.unregister(handle);
        }
        pending.state = InjectionState::Injected;
        tracing::debug!(injection = id, tab_id, frame_id, "injecting viewer navigation into frame");
        Some(Action::ExecuteScriptInFrame {
            injection_id: id,
            tab_id,
            frame_id,
            code: navigation_script(&pending.viewer_url),
        })
    }

    /// Outcome of an injected script. A missing frame opens the viewer in a new tab.
    pub fn on_script_result(
        &mut self,
        registry: &mut ListenerRegistry,
        id: InjectionId,
        frame_found: bool,
    ) -> Option<Action> {
        let pending = self.pending.get(&id)?;
        if pending.state != InjectionState::Injected {
            return None;
        }
        let pending = self.pending.remove(&id)?;
        let tab_id = pending.locator.tab_id;
        let viewer_url = pending.viewer_url.clone();
        pending.release(registry);
        if frame_found {
            return None;
        }
        tracing::warn!(injection = id, tab_id, "frame not found, opening viewer in a new tab");
        Some(Action::CreateTab { url: viewer_url })
    }

    /// The tab closed, whether or not the script was already sent.
    pub fn on_tab_removed(
        &mut self,
        registry: &mut ListenerRegistry,
        id: InjectionId,
        tab_id: TabId,
    ) {
        let matches = self
            .pending
            .get(&id)
            .is_some_and(|p| p.locator.tab_id == tab_id);
        if matches {
            self.drop_pending(registry, id);
        }
    }

    /// Drop every pending injection and release its listeners.
    pub fn clear(&mut self, registry: &mut ListenerRegistry) {
        let ids: Vec<InjectionId> = self.pending.keys().copied().collect();
        for id in ids {
            self.drop_pending(registry, id);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn drop_pending(&mut self, registry: &mut ListenerRegistry, id: InjectionId) {
        if let Some(pending) = self.pending.remove(&id) {
            pending.release(registry);
            tracing::debug!(injection = id, "pending frame injection dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RequestId, ResourceType};

    const VIEWER: &str = "chrome-extension://abc/viewer.html?file=http%3A%2F%2Fex.com%2Fa.pdf";

    fn frame_request() -> RequestDetails {
        RequestDetails {
            request_id: RequestId::new("5"),
            url: "http://ex.com/a.pdf#frag".to_string(),
            method: "GET".to_string(),
            tab_id: 3,
            frame_id: 6,
            resource_type: ResourceType::SubFrame,
        }
    }

    #[test]
    fn script_quotes_the_url() {
        assert_eq!(
            navigation_script("chrome-extension://x/v.html?file=a\"b"),
            r#"location.href = "chrome-extension://x/v.html?file=a\"b";"#
        );
    }

    #[test]
    fn sub_frame_suppresses_then_injects_once() {
        let mut registry = ListenerRegistry::new();
        let mut pending = PendingInjections::new();
        let response = pending.sub_frame(&mut registry, &frame_request(), VIEWER.to_string());
        let BlockingResponse::ResponseHeaders { headers } = response else {
            panic!("expected suppression headers");
        };
        assert_eq!(headers.get("x-frame-options"), Some("deny"));
        assert_eq!(headers.get("x-content-type-options"), Some("nosniff"));
        assert_eq!(registry.len(), 2);

        // Another frame's error is not ours.
        assert!(pending.on_navigation_error(&mut registry, 1, 3, 9).is_none());
        let action = pending.on_navigation_error(&mut registry, 1, 3, 6).unwrap();
        assert!(matches!(action, Action::ExecuteScriptInFrame { frame_id: 6, .. }));
        // Only the tab listener remains until the result is in.
        assert_eq!(registry.len(), 1);
        assert!(pending.on_navigation_error(&mut registry, 1, 3, 6).is_none());

        assert_eq!(
            pending.on_script_result(&mut registry, 1, false),
            Some(Action::CreateTab {
                url: VIEWER.to_string()
            })
        );
        assert!(pending.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn found_frame_needs_nothing_more() {
        let mut registry = ListenerRegistry::new();
        let mut pending = PendingInjections::new();
        pending.sub_frame(&mut registry, &frame_request(), VIEWER.to_string());
        assert!(pending.on_script_result(&mut registry, 1, false).is_none());
        pending.on_navigation_error(&mut registry, 1, 3, 6).unwrap();
        assert!(pending.on_script_result(&mut registry, 1, true).is_none());
        assert!(pending.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn tab_close_drops_the_injection() {
        let mut registry = ListenerRegistry::new();
        let mut pending = PendingInjections::new();
        pending.sub_frame(&mut registry, &frame_request(), VIEWER.to_string());
        pending.on_tab_removed(&mut registry, 1, 3);
        assert!(pending.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn tab_close_after_injection_drops_the_injection() {
        let mut registry = ListenerRegistry::new();
        let mut pending = PendingInjections::new();
        pending.sub_frame(&mut registry, &frame_request(), VIEWER.to_string());
        pending.on_navigation_error(&mut registry, 1, 3, 6).unwrap();

        // No script result ever arrives.
        pending.on_tab_removed(&mut registry, 1, 4);
        assert_eq!(pending.len(), 1);
        pending.on_tab_removed(&mut registry, 1, 3);
        assert!(pending.is_empty());
        assert!(registry.is_empty());
        assert!(pending.on_script_result(&mut registry, 1, false).is_none());
    }
}
