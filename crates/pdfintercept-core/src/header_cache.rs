//! Request Header Cache: outgoing headers of in-flight frame requests.
//!
//! Entries live from send time until the request settles (completes,
//! redirects or fails). The map is process-local and only ever read by the
//! request that owns the entry.

use std::collections::HashMap;

use crate::headers::{HeaderSet, REFERER};
use crate::model::RequestId;

/// How a request left the in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleOutcome {
    Completed,
    Redirected,
    Error,
}

#[derive(Debug, Default)]
pub struct RequestHeaderCache {
    entries: HashMap<RequestId, HeaderSet>,
}

impl RequestHeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the headers sent for `request_id`, replacing any stale entry.
    pub fn on_request_headers_sent(&mut self, request_id: RequestId, headers: HeaderSet) {
        if self.entries.insert(request_id.clone(), headers).is_some() {
            tracing::debug!(%request_id, "replaced stale request header entry");
        }
    }

    /// Forget the entry; called on every terminal outcome.
    pub fn on_request_settled(&mut self, request_id: &RequestId, outcome: SettleOutcome) {
        if self.entries.remove(request_id).is_some() {
            tracing::trace!(%request_id, ?outcome, "request settled, headers dropped");
        }
    }

    /// Referer captured for this request, if any was sent.
    pub fn original_referer(&self, request_id: &RequestId) -> Option<String> {
        self.entries
            .get(request_id)?
            .get(REFERER)
            .map(str::to_string)
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_referer(referer: &str) -> HeaderSet {
        HeaderSet::from_pairs([("Accept", "*/*"), ("Referer", referer)])
    }

    #[test]
    fn store_then_get_returns_stored_referer() {
        let mut cache = RequestHeaderCache::new();
        let id = RequestId::new("r1");
        cache.on_request_headers_sent(id.clone(), headers_with_referer("https://page.example/"));
        assert_eq!(
            cache.original_referer(&id).as_deref(),
            Some("https://page.example/")
        );
    }

    #[test]
    fn store_settle_get_returns_nothing() {
        let mut cache = RequestHeaderCache::new();
        let id = RequestId::new("r1");
        cache.on_request_headers_sent(id.clone(), headers_with_referer("https://page.example/"));
        cache.on_request_settled(&id, SettleOutcome::Completed);
        assert!(cache.original_referer(&id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn every_outcome_prunes() {
        let mut cache = RequestHeaderCache::new();
        for (n, outcome) in [
            SettleOutcome::Completed,
            SettleOutcome::Redirected,
            SettleOutcome::Error,
        ]
        .into_iter()
        .enumerate()
        {
            let id = RequestId::new(format!("r{n}"));
            cache.on_request_headers_sent(id.clone(), HeaderSet::new());
            cache.on_request_settled(&id, outcome);
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_referer_or_entry_is_none() {
        let mut cache = RequestHeaderCache::new();
        let id = RequestId::new("r1");
        assert!(cache.original_referer(&id).is_none());
        cache.on_request_headers_sent(id.clone(), HeaderSet::from_pairs([("Accept", "*/*")]));
        assert!(cache.contains(&id));
        assert!(cache.original_referer(&id).is_none());
    }

    #[test]
    fn overwrite_replaces_stale_entry() {
        let mut cache = RequestHeaderCache::new();
        let id = RequestId::new("r1");
        cache.on_request_headers_sent(id.clone(), headers_with_referer("https://old.example/"));
        cache.on_request_headers_sent(id.clone(), headers_with_referer("https://new.example/"));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.original_referer(&id).as_deref(),
            Some("https://new.example/")
        );
    }
}
