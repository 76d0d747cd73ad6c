//! The interceptor: owns all engine state and routes bus events to it.
//!
//! The host calls [`Interceptor::start`] once, feeds every browser event to
//! [`Interceptor::dispatch`] and applies the returned [`Dispatch`]. Events only
//! reach components through listeners that are live in the registry, and the
//! set of listeners for an event is snapshotted before any handler runs.

use crate::capability::Capabilities;
use crate::config::InterceptConfig;
use crate::engine::{Decision, InterceptEngine};
use crate::error::InterceptError;
use crate::events::{Action, BlockingResponse, BrowserEvent, Dispatch};
use crate::header_cache::RequestHeaderCache;
use crate::listeners::{
    EventScope, ListenerFilter, ListenerHandle, ListenerKind, ListenerOwner, ListenerRegistry,
    Route,
};
use crate::model::{RequestDetails, FRAME_TYPES};
use crate::pattern::UrlPattern;
use crate::sticking::RefererSticker;

#[derive(Debug)]
pub struct Interceptor {
    config: InterceptConfig,
    registry: ListenerRegistry,
    cache: RequestHeaderCache,
    sticker: RefererSticker,
    engine: InterceptEngine,
    routes: Vec<ListenerHandle>,
    started: bool,
}

impl Interceptor {
    pub fn new(
        config: InterceptConfig,
        capabilities: Capabilities,
    ) -> Result<Self, InterceptError> {
        config.validate()?;
        let viewer = config.viewer()?;
        Ok(Self {
            sticker: RefererSticker::new(
                viewer.clone(),
                &config.alive_channel,
                &config.referer_channel_prefix,
            ),
            engine: InterceptEngine::new(viewer, &config.download_marker, capabilities),
            config,
            registry: ListenerRegistry::new(),
            cache: RequestHeaderCache::new(),
            routes: Vec::new(),
            started: false,
        })
    }

    /// Register the startup listeners. Calling it again is a no-op.
    pub fn start(&mut self) -> Vec<Action> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        let frames = ListenerFilter::any().types(FRAME_TYPES);
        let http = self.registry.register(
            ListenerKind::HeadersReceived,
            frames.clone().urls([UrlPattern::all_urls()]),
            ListenerOwner::Route(Route::Http),
        );
        self.routes.push(http);

        if self.engine.capabilities().ftp_interception {
            let ftp = self.registry.register(
                ListenerKind::BeforeRequest,
                frames.clone().urls([pattern("ftp://*/*")]),
                ListenerOwner::Route(Route::Ftp),
            );
            self.routes.push(ftp);
        } else {
            tracing::info!("ftp interception unsupported, ftp route not registered");
        }

        let file = self.registry.register(
            ListenerKind::BeforeRequest,
            frames.clone().urls([pattern("file://*/*")]),
            ListenerOwner::Route(Route::File),
        );
        self.routes.push(file);

        let web = frames.urls([pattern("*://*/*")]);
        self.registry.register(
            ListenerKind::BeforeSendHeaders,
            web.clone(),
            ListenerOwner::HeaderCache,
        );
        self.registry
            .register(ListenerKind::RequestSettled, web, ListenerOwner::HeaderCache);
        self.registry.register(
            ListenerKind::ChannelOpened,
            ListenerFilter::any(),
            ListenerOwner::RefererHandshake,
        );

        tracing::info!(
            viewer = %self.config.viewer_url,
            routes = self.routes.len(),
            "interceptor started"
        );
        self.drain_actions()
    }

    /// Stop intercepting: unregister the request routes and drop scheduled
    /// frame injections. Requests already decided keep their outcome.
    pub fn deactivate(&mut self) -> Vec<Action> {
        let routes = std::mem::take(&mut self.routes);
        for handle in &routes {
            self.registry.unregister(*handle);
        }
        self.engine.deactivate(&mut self.registry);
        tracing::info!(routes = routes.len(), "interceptor deactivated");
        self.drain_actions()
    }

    /// True while the request routes are registered.
    pub fn is_active(&self) -> bool {
        self.routes.iter().any(|handle| self.registry.is_live(*handle))
    }

    pub fn dispatch(&mut self, event: BrowserEvent) -> Dispatch {
        let mut response = BlockingResponse::PassThrough;
        let mut actions = Vec::new();

        match &event {
            BrowserEvent::BeforeRequest { request } => {
                let scope = request_scope(request);
                for (handle, owner) in self.snapshot(ListenerKind::BeforeRequest, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    if let ListenerOwner::Route(Route::Ftp | Route::File) = owner {
                        let decision = self.engine.on_before_request(
                            &mut self.registry,
                            &self.cache,
                            &mut self.sticker,
                            request,
                        );
                        merge(&mut response, &mut actions, decision);
                    }
                }
            }
            BrowserEvent::BeforeSendHeaders { request, headers } => {
                // Every listener judges the headers as sent; rewrites accumulate.
                let mut outgoing = headers.clone();
                let mut modified = false;
                for (handle, owner) in
                    self.snapshot(ListenerKind::BeforeSendHeaders, request_scope(request))
                {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    match owner {
                        ListenerOwner::Session(id) => {
                            modified |= self.sticker.on_before_send_headers(
                                &mut self.registry,
                                id,
                                request,
                                headers,
                                &mut outgoing,
                            );
                        }
                        ListenerOwner::HeaderCache => {
                            self.cache.on_request_headers_sent(
                                request.request_id.clone(),
                                headers.clone(),
                            );
                        }
                        _ => {}
                    }
                }
                if modified {
                    response = BlockingResponse::RequestHeaders { headers: outgoing };
                }
            }
            BrowserEvent::HeadersReceived {
                request,
                response_headers,
            } => {
                for (handle, owner) in
                    self.snapshot(ListenerKind::HeadersReceived, request_scope(request))
                {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    if owner == ListenerOwner::Route(Route::Http) {
                        let decision = self.engine.on_headers_received(
                            &mut self.registry,
                            &self.cache,
                            &mut self.sticker,
                            request,
                            response_headers.as_ref(),
                        );
                        merge(&mut response, &mut actions, decision);
                    }
                }
            }
            BrowserEvent::RequestSettled { request, outcome } => {
                for (handle, owner) in
                    self.snapshot(ListenerKind::RequestSettled, request_scope(request))
                {
                    if self.registry.is_live(handle) && owner == ListenerOwner::HeaderCache {
                        self.cache.on_request_settled(&request.request_id, *outcome);
                    }
                }
            }
            BrowserEvent::TabRemoved { tab_id } => {
                let scope = EventScope {
                    tab_id: Some(*tab_id),
                    ..EventScope::default()
                };
                for (handle, owner) in self.snapshot(ListenerKind::TabRemoved, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    match owner {
                        ListenerOwner::Session(id) => {
                            self.sticker.on_tab_removed(&mut self.registry, id, *tab_id)
                        }
                        ListenerOwner::Injection(id) => {
                            self.engine.on_tab_removed(&mut self.registry, id, *tab_id)
                        }
                        _ => {}
                    }
                }
            }
            BrowserEvent::BeforeNavigate {
                tab_id,
                frame_id,
                url,
            } => {
                let scope = EventScope {
                    url: Some(url),
                    tab_id: Some(*tab_id),
                    ..EventScope::default()
                };
                for (handle, owner) in self.snapshot(ListenerKind::BeforeNavigate, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    if let ListenerOwner::Session(id) = owner {
                        self.sticker
                            .on_before_navigate(&mut self.registry, id, *tab_id, *frame_id);
                    }
                }
            }
            BrowserEvent::NavigationError {
                tab_id,
                frame_id,
                url,
            } => {
                let scope = EventScope {
                    url: Some(url),
                    tab_id: Some(*tab_id),
                    ..EventScope::default()
                };
                for (handle, owner) in self.snapshot(ListenerKind::NavigationError, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    if let ListenerOwner::Injection(id) = owner {
                        actions.extend(self.engine.on_navigation_error(
                            &mut self.registry,
                            id,
                            *tab_id,
                            *frame_id,
                        ));
                    }
                }
            }
            BrowserEvent::ChannelOpened {
                channel_id,
                name,
                sender,
            } => {
                let scope = EventScope {
                    tab_id: Some(sender.tab_id),
                    channel_id: Some(*channel_id),
                    ..EventScope::default()
                };
                for (handle, owner) in self.snapshot(ListenerKind::ChannelOpened, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    match owner {
                        ListenerOwner::RefererHandshake => actions.extend(
                            self.sticker
                                .on_viewer_channel(&mut self.registry, *channel_id, name, sender),
                        ),
                        ListenerOwner::Session(id) => self.sticker.on_channel_opened(
                            &mut self.registry,
                            id,
                            *channel_id,
                            name,
                            sender,
                        ),
                        _ => {}
                    }
                }
            }
            BrowserEvent::ChannelClosed { channel_id } => {
                let scope = EventScope {
                    channel_id: Some(*channel_id),
                    ..EventScope::default()
                };
                for (handle, owner) in self.snapshot(ListenerKind::ChannelClosed, scope) {
                    if !self.registry.is_live(handle) {
                        continue;
                    }
                    if let ListenerOwner::Session(id) = owner {
                        self.sticker.on_channel_closed(&mut self.registry, id);
                    }
                }
            }
            BrowserEvent::ScriptResult {
                injection_id,
                frame_found,
            } => {
                actions.extend(self.engine.on_script_result(
                    &mut self.registry,
                    *injection_id,
                    *frame_found,
                ));
            }
        }

        actions.extend(self.drain_actions());
        Dispatch { response, actions }
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn header_cache(&self) -> &RequestHeaderCache {
        &self.cache
    }

    pub fn sticker(&self) -> &RefererSticker {
        &self.sticker
    }

    pub fn pending_injections(&self) -> usize {
        self.engine.pending_injections()
    }

    fn snapshot(
        &self,
        kind: ListenerKind,
        scope: EventScope<'_>,
    ) -> Vec<(ListenerHandle, ListenerOwner)> {
        self.registry.matching(kind, &scope)
    }

    fn drain_actions(&mut self) -> Vec<Action> {
        self.registry
            .drain_changes()
            .into_iter()
            .map(Action::from)
            .collect()
    }
}

fn request_scope(request: &RequestDetails) -> EventScope<'_> {
    EventScope {
        url: Some(&request.url),
        resource_type: Some(request.resource_type),
        tab_id: Some(request.tab_id),
        channel_id: None,
    }
}

/// Built-in route patterns; a parse failure would be a programming error.
fn pattern(source: &str) -> UrlPattern {
    UrlPattern::parse(source).unwrap_or_else(|_| UrlPattern::all_urls())
}

/// The first non-pass-through answer wins.
fn merge(response: &mut BlockingResponse, actions: &mut Vec<Action>, decision: Decision) {
    if response.is_pass_through() {
        *response = decision.response;
    }
    actions.extend(decision.actions);
}
