//! Listener registry: the arena of live event listeners.
//!
//! Every component that wants to observe an event registers a listener here
//! and gets a [`ListenerHandle`] back. Dispatch only reaches live handles, so
//! unregistering a handle is all it takes to stop a listener. Registrations
//! and removals are journaled so the host can mirror them on the platform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ChannelId, ResourceType, TabId};
use crate::pattern::UrlPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerHandle(u64);

impl std::fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Event stream a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    BeforeRequest,
    BeforeSendHeaders,
    HeadersReceived,
    RequestSettled,
    TabRemoved,
    BeforeNavigate,
    NavigationError,
    ChannelOpened,
    ChannelClosed,
}

/// Which events of a kind reach a listener. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<UrlPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}

impl ListenerFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn urls(mut self, urls: impl IntoIterator<Item = UrlPattern>) -> Self {
        self.urls = urls.into_iter().collect();
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = ResourceType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    pub fn tab(mut self, tab_id: TabId) -> Self {
        self.tab_id = Some(tab_id);
        self
    }

    pub fn channel(mut self, channel_id: ChannelId) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    fn accepts(&self, scope: &EventScope<'_>) -> bool {
        let url_ok = self.urls.is_empty()
            || scope
                .url
                .is_some_and(|url| self.urls.iter().any(|p| p.matches(url)));
        let type_ok = self.types.is_empty()
            || scope
                .resource_type
                .is_some_and(|t| self.types.contains(&t));
        let tab_ok = self.tab_id.is_none() || self.tab_id == scope.tab_id;
        let channel_ok = self.channel_id.is_none() || self.channel_id == scope.channel_id;
        url_ok && type_ok && tab_ok && channel_ok
    }
}

/// The parts of an event that filters look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventScope<'a> {
    pub url: Option<&'a str>,
    pub resource_type: Option<ResourceType>,
    pub tab_id: Option<TabId>,
    pub channel_id: Option<ChannelId>,
}

/// Top-level interception routes owned by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Http,
    Ftp,
    File,
}

/// Component that receives a listener's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerOwner {
    Route(Route),
    HeaderCache,
    RefererHandshake,
    Session(u64),
    Injection(u64),
}

#[derive(Debug, Clone)]
struct Registration {
    kind: ListenerKind,
    filter: ListenerFilter,
    owner: ListenerOwner,
}

/// A registry mutation the host may need to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerChange {
    Registered {
        handle: ListenerHandle,
        kind: ListenerKind,
        filter: ListenerFilter,
    },
    Unregistered {
        handle: ListenerHandle,
    },
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_handle: u64,
    live: BTreeMap<ListenerHandle, Registration>,
    journal: Vec<ListenerChange>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: ListenerKind,
        filter: ListenerFilter,
        owner: ListenerOwner,
    ) -> ListenerHandle {
        self.next_handle += 1;
        let handle = ListenerHandle(self.next_handle);
        self.journal.push(ListenerChange::Registered {
            handle,
            kind,
            filter: filter.clone(),
        });
        self.live.insert(
            handle,
            Registration {
                kind,
                filter,
                owner,
            },
        );
        handle
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unregister(&mut self, handle: ListenerHandle) -> bool {
        if self.live.remove(&handle).is_none() {
            return false;
        }
        self.journal.push(ListenerChange::Unregistered { handle });
        true
    }

    pub fn is_live(&self, handle: ListenerHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Snapshot of live listeners for an event, in registration order.
    pub fn matching(
        &self,
        kind: ListenerKind,
        scope: &EventScope<'_>,
    ) -> Vec<(ListenerHandle, ListenerOwner)> {
        self.live
            .iter()
            .filter(|(_, reg)| reg.kind == kind && reg.filter.accepts(scope))
            .map(|(handle, reg)| (*handle, reg.owner))
            .collect()
    }

    /// Number of live listeners held by `owner`.
    pub fn count_owned_by(&self, owner: ListenerOwner) -> usize {
        self.live.values().filter(|reg| reg.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn drain_changes(&mut self) -> Vec<ListenerChange> {
        std::mem::take(&mut self.journal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_respects_kind_and_filter() {
        let mut registry = ListenerRegistry::new();
        let pdf = registry.register(
            ListenerKind::BeforeSendHeaders,
            ListenerFilter::any()
                .urls([UrlPattern::exact("http://ex.com/a.pdf")])
                .types([ResourceType::XmlHttpRequest])
                .tab(7),
            ListenerOwner::Session(1),
        );
        registry.register(
            ListenerKind::TabRemoved,
            ListenerFilter::any(),
            ListenerOwner::Session(1),
        );

        let hit = EventScope {
            url: Some("http://ex.com/a.pdf"),
            resource_type: Some(ResourceType::XmlHttpRequest),
            tab_id: Some(7),
            channel_id: None,
        };
        assert_eq!(
            registry.matching(ListenerKind::BeforeSendHeaders, &hit),
            vec![(pdf, ListenerOwner::Session(1))]
        );

        let other_tab = EventScope {
            tab_id: Some(8),
            ..hit
        };
        assert!(registry
            .matching(ListenerKind::BeforeSendHeaders, &other_tab)
            .is_empty());
        let other_type = EventScope {
            resource_type: Some(ResourceType::SubFrame),
            ..hit
        };
        assert!(registry
            .matching(ListenerKind::BeforeSendHeaders, &other_type)
            .is_empty());
    }

    #[test]
    fn unregister_is_idempotent_and_journaled() {
        let mut registry = ListenerRegistry::new();
        let handle = registry.register(
            ListenerKind::ChannelClosed,
            ListenerFilter::any().channel(3),
            ListenerOwner::Session(9),
        );
        assert_eq!(registry.count_owned_by(ListenerOwner::Session(9)), 1);
        assert!(registry.unregister(handle));
        assert!(!registry.unregister(handle));
        assert!(!registry.is_live(handle));

        let changes = registry.drain_changes();
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[1], ListenerChange::Unregistered { handle: h } if h == handle));
        assert!(registry.drain_changes().is_empty());
    }
}
