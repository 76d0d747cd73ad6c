//! Identifiers and request metadata shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier.
pub type TabId = i64;

/// Frame identifier within a tab; `0` is the tab's main document.
pub type FrameId = i64;

/// Identifier of a viewer-to-background message channel.
pub type ChannelId = u64;

/// Frame id of a tab's top-level document.
pub const MAIN_FRAME_ID: FrameId = 0;

/// Opaque per-request identifier, valid from send until completion/redirect/error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a navigable document context: `(tab, frame)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameLocator {
    pub tab_id: TabId,
    pub frame_id: FrameId,
}

impl FrameLocator {
    pub fn new(tab_id: TabId, frame_id: FrameId) -> Self {
        Self { tab_id, frame_id }
    }

    pub fn is_main_frame(&self) -> bool {
        self.frame_id == MAIN_FRAME_ID
    }
}

/// Kind of resource a request loads, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    XmlHttpRequest,
    Other,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MainFrame => "main_frame",
            Self::SubFrame => "sub_frame",
            Self::XmlHttpRequest => "xmlhttprequest",
            Self::Other => "other",
        }
    }
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "main_frame" => Self::MainFrame,
            "sub_frame" => Self::SubFrame,
            "xmlhttprequest" => Self::XmlHttpRequest,
            _ => Self::Other,
        }
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_str().to_string()
    }
}

/// Frame document loads; the only types the interception routes watch.
pub const FRAME_TYPES: [ResourceType; 2] = [ResourceType::MainFrame, ResourceType::SubFrame];

/// Metadata about one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub request_id: RequestId,
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub tab_id: TabId,
    pub frame_id: FrameId,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestDetails {
    pub fn locator(&self) -> FrameLocator {
        FrameLocator::new(self.tab_id, self.frame_id)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// URL scheme in lowercase, or an empty string for unparseable URLs.
    pub fn scheme(&self) -> String {
        match self.url.split_once(':') {
            Some((scheme, _)) => scheme.to_ascii_lowercase(),
            None => String::new(),
        }
    }
}
