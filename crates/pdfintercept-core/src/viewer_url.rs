//! Viewer page URL contract: `<viewer>?file=<encodeURIComponent(resource)>`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::InterceptError;

/// Characters `encodeURIComponent` leaves untouched.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const FILE_PARAM: &str = "file=";

/// The internal viewer page every PDF is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerUrl {
    base: String,
    scheme_prefix: String,
}

impl ViewerUrl {
    pub fn new(base: &str) -> Result<Self, InterceptError> {
        let parsed = url::Url::parse(base).map_err(|source| InterceptError::InvalidViewerUrl {
            url: base.to_string(),
            source,
        })?;
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(InterceptError::ViewerUrlHasQuery(base.to_string()));
        }
        Ok(Self {
            base: base.to_string(),
            scheme_prefix: format!("{}:", parsed.scheme()),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Viewer URL that loads `resource_url`.
    pub fn for_resource(&self, resource_url: &str) -> String {
        format!(
            "{}?{FILE_PARAM}{}",
            self.base,
            utf8_percent_encode(resource_url, URI_COMPONENT)
        )
    }

    /// Scheme of the viewer page including the colon, e.g. `chrome-extension:`.
    pub fn extension_scheme_prefix(&self) -> &str {
        &self.scheme_prefix
    }

    /// True for URLs served by the extension itself (same scheme as the viewer).
    pub fn is_extension_url(&self, value: &str) -> bool {
        value
            .get(..self.scheme_prefix.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.scheme_prefix))
    }

    /// True if `url` is this viewer page (with any query or fragment).
    pub fn is_viewer_page(&self, url: &str) -> bool {
        url.strip_prefix(&self.base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['?', '#']))
    }
}

/// Recovers the original resource URL from a viewer page URL.
///
/// The viewer's own fragment (e.g. `#page=3`) is carried over when the decoded
/// resource URL does not already have one.
pub fn original_resource_url(viewer_url: &str) -> Option<String> {
    let (without_fragment, fragment) = match viewer_url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (viewer_url, None),
    };
    let (_, query) = without_fragment.split_once('?')?;
    let encoded = query.strip_prefix(FILE_PARAM)?;
    let encoded = encoded.split('&').next().unwrap_or_default();
    if encoded.is_empty() {
        return None;
    }

    let mut original = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
    if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
        if !original.contains('#') {
            original.push('#');
            original.push_str(fragment);
        }
    }
    Some(original)
}
