//! Inbound browser notifications and outbound instructions.

use serde::{Deserialize, Serialize};

use crate::header_cache::SettleOutcome;
use crate::headers::HeaderSet;
use crate::listeners::{ListenerChange, ListenerFilter, ListenerHandle, ListenerKind};
use crate::model::{ChannelId, FrameId, RequestDetails, RequestId, TabId};

/// Identifier pairing a script injection with its reported result.
pub type InjectionId = u64;

/// Sender of a viewer channel. `frame_id` is absent on platforms that do not
/// report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSender {
    pub tab_id: TabId,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
}

/// A notification delivered by the browser's event system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A request is about to start; no headers are known yet.
    BeforeRequest { request: RequestDetails },
    /// Outgoing request headers, which listeners may rewrite.
    BeforeSendHeaders {
        request: RequestDetails,
        headers: HeaderSet,
    },
    /// Response headers arrived, which listeners may rewrite.
    HeadersReceived {
        request: RequestDetails,
        #[serde(default)]
        response_headers: Option<HeaderSet>,
    },
    RequestSettled {
        request: RequestDetails,
        outcome: SettleOutcome,
    },
    TabRemoved { tab_id: TabId },
    BeforeNavigate {
        tab_id: TabId,
        frame_id: FrameId,
        url: String,
    },
    NavigationError {
        tab_id: TabId,
        frame_id: FrameId,
        url: String,
    },
    ChannelOpened {
        channel_id: ChannelId,
        name: String,
        sender: ChannelSender,
    },
    ChannelClosed { channel_id: ChannelId },
    /// Result of an [`Action::ExecuteScriptInFrame`].
    ScriptResult {
        injection_id: InjectionId,
        frame_found: bool,
    },
}

/// Answer to a blocking request listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockingResponse {
    #[default]
    PassThrough,
    Redirect {
        url: String,
    },
    Cancel,
    ResponseHeaders {
        headers: HeaderSet,
    },
    RequestHeaders {
        headers: HeaderSet,
    },
}

impl BlockingResponse {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }
}

/// Side effect the host must perform on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    NavigateTab {
        tab_id: TabId,
        url: String,
    },
    ExecuteScriptInFrame {
        injection_id: InjectionId,
        tab_id: TabId,
        frame_id: FrameId,
        code: String,
    },
    CreateTab {
        url: String,
    },
    /// Empty acknowledgement posted back on a viewer channel.
    AcknowledgeChannel {
        channel_id: ChannelId,
    },
    DisconnectChannel {
        channel_id: ChannelId,
    },
    RegisterListener {
        handle: ListenerHandle,
        kind: ListenerKind,
        filter: ListenerFilter,
    },
    UnregisterListener {
        handle: ListenerHandle,
    },
}

impl From<ListenerChange> for Action {
    fn from(change: ListenerChange) -> Self {
        match change {
            ListenerChange::Registered {
                handle,
                kind,
                filter,
            } => Action::RegisterListener {
                handle,
                kind,
                filter,
            },
            ListenerChange::Unregistered { handle } => Action::UnregisterListener { handle },
        }
    }
}

/// Everything produced while handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub response: BlockingResponse,
    pub actions: Vec<Action>,
}

impl Dispatch {
    /// Actions other than listener bookkeeping.
    pub fn effects(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|action| {
            !matches!(
                action,
                Action::RegisterListener { .. } | Action::UnregisterListener { .. }
            )
        })
    }
}

impl BrowserEvent {
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::BeforeRequest { request }
            | Self::BeforeSendHeaders { request, .. }
            | Self::HeadersReceived { request, .. }
            | Self::RequestSettled { request, .. } => Some(&request.request_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceType;

    #[test]
    fn headers_received_deserializes_from_tagged_json() {
        let json = r#"{
            "event": "headers_received",
            "request": {
                "request_id": "9",
                "url": "http://ex.com/doc.pdf",
                "method": "GET",
                "tab_id": 1,
                "frame_id": 0,
                "type": "main_frame"
            },
            "response_headers": [ { "name": "Content-Type", "value": "application/pdf" } ]
        }"#;
        let event: BrowserEvent = serde_json::from_str(json).unwrap();
        match &event {
            BrowserEvent::HeadersReceived {
                request,
                response_headers,
            } => {
                assert_eq!(request.resource_type, ResourceType::MainFrame);
                assert_eq!(
                    response_headers.as_ref().unwrap().get("content-type"),
                    Some("application/pdf")
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(event.request_id().unwrap().as_str(), "9");
    }

    #[test]
    fn channel_sender_frame_is_optional() {
        let json = r#"{"event":"channel_opened","channel_id":4,"name":"x","sender":{"tab_id":2}}"#;
        let event: BrowserEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            BrowserEvent::ChannelOpened { sender: ChannelSender { frame_id: None, .. }, .. }
        ));
    }

    #[test]
    fn redirect_serializes_with_kind_tag() {
        let response = BlockingResponse::Redirect {
            url: "chrome-extension://x/viewer.html?file=a".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"redirect","url":"chrome-extension://x/viewer.html?file=a"}"#
        );
    }
}
