//! Interception Decision Engine.
//!
//! Decides, per response or per header-less request, whether to pass through,
//! force a download, or send the user to the viewer. The policy for a
//! response with headers:
//!
//! 1. Anything but GET passes through.
//! 2. Non-PDF responses pass through.
//! 3. A requested download gets an `attachment` disposition and no redirect.
//! 4. Otherwise the viewer URL is built from the resource URL.
//! 5. A captured referer arms a sticking session before the redirect leaves.
//! 6. The redirect is issued, or emulated where the platform can't redirect.
//!
//! FTP and local files have no headers: steps 1 to 3 are skipped and any
//! `.pdf` URL is redirected unless a download was requested.

mod fallback;

pub use fallback::{navigation_script, suppression_headers, PendingInjections};

use crate::capability::Capabilities;
use crate::events::{Action, BlockingResponse, InjectionId};
use crate::header_cache::RequestHeaderCache;
use crate::headers::{
    ensure_attachment_disposition, has_pdf_extension, is_download_requested, is_pdf_resource,
    HeaderSet,
};
use crate::listeners::ListenerRegistry;
use crate::model::{FrameId, RequestDetails, ResourceType, TabId};
use crate::sticking::RefererSticker;
use crate::viewer_url::ViewerUrl;

/// Result of one engine decision.
#[derive(Debug, Default)]
pub struct Decision {
    pub response: BlockingResponse,
    pub actions: Vec<Action>,
}

impl Decision {
    fn pass() -> Self {
        Self::default()
    }

    fn respond(response: BlockingResponse) -> Self {
        Self {
            response,
            actions: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct InterceptEngine {
    viewer: ViewerUrl,
    download_marker: String,
    capabilities: Capabilities,
    injections: PendingInjections,
}

impl InterceptEngine {
    pub fn new(viewer: ViewerUrl, download_marker: &str, capabilities: Capabilities) -> Self {
        Self {
            viewer,
            download_marker: download_marker.to_string(),
            capabilities,
            injections: PendingInjections::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn viewer(&self) -> &ViewerUrl {
        &self.viewer
    }

    /// Decide on a response whose headers just arrived (HTTP/HTTPS).
    pub fn on_headers_received(
        &mut self,
        registry: &mut ListenerRegistry,
        cache: &RequestHeaderCache,
        sticker: &mut RefererSticker,
        request: &RequestDetails,
        response_headers: Option<&HeaderSet>,
    ) -> Decision {
        if !request.is_get() {
            tracing::trace!(
                request_id = %request.request_id,
                method = %request.method,
                "non-GET request declined"
            );
            return Decision::pass();
        }
        let Some(headers) = response_headers else {
            tracing::trace!(request_id = %request.request_id, "no response headers, declined");
            return Decision::pass();
        };
        if !is_pdf_resource(request, headers) {
            return Decision::pass();
        }
        if is_download_requested(request, Some(headers), &self.download_marker) {
            return match ensure_attachment_disposition(headers) {
                Some(headers) => {
                    tracing::debug!(
                        request_id = %request.request_id,
                        "download requested, forcing attachment"
                    );
                    Decision::respond(BlockingResponse::ResponseHeaders { headers })
                }
                None => Decision::pass(),
            };
        }
        self.redirect_to_viewer(registry, cache, sticker, request)
    }

    /// Decide on an FTP or local file request before it starts.
    ///
    /// A before-request event can always be answered with a redirect, so the
    /// redirect-less fallback never applies here.
    pub fn on_before_request(
        &mut self,
        registry: &mut ListenerRegistry,
        cache: &RequestHeaderCache,
        sticker: &mut RefererSticker,
        request: &RequestDetails,
    ) -> Decision {
        if !has_pdf_extension(&request.url) {
            return Decision::pass();
        }
        if is_download_requested(request, None, &self.download_marker) {
            return Decision::pass();
        }
        let viewer_url = self.viewer.for_resource(&request.url);
        arm_referer(registry, cache, sticker, request);
        Decision::respond(redirect(request, viewer_url))
    }

    fn redirect_to_viewer(
        &mut self,
        registry: &mut ListenerRegistry,
        cache: &RequestHeaderCache,
        sticker: &mut RefererSticker,
        request: &RequestDetails,
    ) -> Decision {
        let viewer_url = self.viewer.for_resource(&request.url);
        arm_referer(registry, cache, sticker, request);

        if self.capabilities.redirect_url {
            return Decision::respond(redirect(request, viewer_url));
        }

        match request.resource_type {
            ResourceType::MainFrame => {
                let (response, actions) = PendingInjections::main_frame(request, viewer_url);
                Decision { response, actions }
            }
            _ => Decision::respond(self.injections.sub_frame(registry, request, viewer_url)),
        }
    }

    pub fn on_navigation_error(
        &mut self,
        registry: &mut ListenerRegistry,
        injection: InjectionId,
        tab_id: TabId,
        frame_id: FrameId,
    ) -> Option<Action> {
        self.injections
            .on_navigation_error(registry, injection, tab_id, frame_id)
    }

    pub fn on_script_result(
        &mut self,
        registry: &mut ListenerRegistry,
        injection: InjectionId,
        frame_found: bool,
    ) -> Option<Action> {
        self.injections
            .on_script_result(registry, injection, frame_found)
    }

    pub fn on_tab_removed(
        &mut self,
        registry: &mut ListenerRegistry,
        injection: InjectionId,
        tab_id: TabId,
    ) {
        self.injections.on_tab_removed(registry, injection, tab_id);
    }

    /// Forget every scheduled frame injection.
    pub fn deactivate(&mut self, registry: &mut ListenerRegistry) {
        self.injections.clear(registry);
    }

    pub fn pending_injections(&self) -> usize {
        self.injections.len()
    }
}

/// Arm a sticking session from the referer captured for `request`, if any.
/// Runs before the redirect leaves so the rule exists before the viewer fetches.
fn arm_referer(
    registry: &mut ListenerRegistry,
    cache: &RequestHeaderCache,
    sticker: &mut RefererSticker,
    request: &RequestDetails,
) {
    if let Some(referer) = cache
        .original_referer(&request.request_id)
        .filter(|r| !r.is_empty())
    {
        sticker.arm_for_redirect(
            registry,
            &request.request_id,
            request.locator(),
            &request.url,
            &referer,
        );
    }
}

fn redirect(request: &RequestDetails, viewer_url: String) -> BlockingResponse {
    tracing::info!(
        request_id = %request.request_id,
        tab_id = request.tab_id,
        frame_id = request.frame_id,
        url = %request.url,
        "redirecting PDF to viewer"
    );
    BlockingResponse::Redirect { url: viewer_url }
}
