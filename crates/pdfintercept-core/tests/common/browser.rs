//! Minimal simulated browser for driving an `Interceptor` in tests.

#![allow(dead_code)]

use pdfintercept_core::capability::Capabilities;
use pdfintercept_core::config::InterceptConfig;
use pdfintercept_core::events::{ChannelSender, Dispatch};
use pdfintercept_core::header_cache::SettleOutcome;
use pdfintercept_core::headers::HeaderSet;
use pdfintercept_core::model::{FrameId, RequestDetails, RequestId, ResourceType, TabId};
use pdfintercept_core::{BrowserEvent, Interceptor};

pub const VIEWER: &str = concat!(
    "chrome-extension://oemmndcbldboiebfnladdacbdfmadadm",
    "/content/web/viewer.html"
);

pub fn interceptor(capabilities: Capabilities) -> Interceptor {
    let mut interceptor = Interceptor::new(InterceptConfig::default(), capabilities).unwrap();
    interceptor.start();
    interceptor
}

pub fn viewer_for(url: &str) -> String {
    pdfintercept_core::viewer_url::ViewerUrl::new(VIEWER)
        .unwrap()
        .for_resource(url)
}

pub struct RequestBuilder {
    details: RequestDetails,
}

pub fn request(id: &str, url: &str) -> RequestBuilder {
    RequestBuilder {
        details: RequestDetails {
            request_id: RequestId::new(id),
            url: url.to_string(),
            method: "GET".to_string(),
            tab_id: 1,
            frame_id: 0,
            resource_type: ResourceType::MainFrame,
        },
    }
}

impl RequestBuilder {
    pub fn method(mut self, method: &str) -> Self {
        self.details.method = method.to_string();
        self
    }

    pub fn in_frame(mut self, tab_id: TabId, frame_id: FrameId) -> Self {
        self.details.tab_id = tab_id;
        self.details.frame_id = frame_id;
        if frame_id != 0 && self.details.resource_type == ResourceType::MainFrame {
            self.details.resource_type = ResourceType::SubFrame;
        }
        self
    }

    pub fn kind(mut self, resource_type: ResourceType) -> Self {
        self.details.resource_type = resource_type;
        self
    }

    pub fn build(self) -> RequestDetails {
        self.details
    }
}

pub fn headers(pairs: &[(&str, &str)]) -> HeaderSet {
    HeaderSet::from_pairs(pairs.iter().copied())
}

pub fn send_headers(
    interceptor: &mut Interceptor,
    request: &RequestDetails,
    headers: HeaderSet,
) -> Dispatch {
    interceptor.dispatch(BrowserEvent::BeforeSendHeaders {
        request: request.clone(),
        headers,
    })
}

pub fn receive_headers(
    interceptor: &mut Interceptor,
    request: &RequestDetails,
    headers: HeaderSet,
) -> Dispatch {
    interceptor.dispatch(BrowserEvent::HeadersReceived {
        request: request.clone(),
        response_headers: Some(headers),
    })
}

pub fn settle(
    interceptor: &mut Interceptor,
    request: &RequestDetails,
    outcome: SettleOutcome,
) -> Dispatch {
    interceptor.dispatch(BrowserEvent::RequestSettled {
        request: request.clone(),
        outcome,
    })
}

pub fn open_channel(
    interceptor: &mut Interceptor,
    channel_id: u64,
    name: &str,
    tab_id: TabId,
    frame_id: Option<FrameId>,
) -> Dispatch {
    interceptor.dispatch(BrowserEvent::ChannelOpened {
        channel_id,
        name: name.to_string(),
        sender: ChannelSender { tab_id, frame_id },
    })
}

/// Full navigation of a PDF in a frame with a referer: send, receive, settle.
pub fn load_pdf_with_referer(
    interceptor: &mut Interceptor,
    id: &str,
    url: &str,
    tab_id: TabId,
    frame_id: FrameId,
    referer: &str,
) -> Dispatch {
    let req = request(id, url).in_frame(tab_id, frame_id).build();
    send_headers(interceptor, &req, headers(&[("Referer", referer)]));
    let dispatch = receive_headers(
        interceptor,
        &req,
        headers(&[("Content-Type", "application/pdf")]),
    );
    settle(interceptor, &req, SettleOutcome::Redirected);
    dispatch
}

/// Viewer's XHR for the resource from `frame_id` of `tab_id`.
pub fn viewer_fetch(id: &str, url: &str, tab_id: TabId, frame_id: FrameId) -> RequestDetails {
    request(id, url)
        .in_frame(tab_id, frame_id)
        .kind(ResourceType::XmlHttpRequest)
        .build()
}
