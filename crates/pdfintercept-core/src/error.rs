//! Error types for the interception engine.
//!
//! The decision path itself never fails: missing data degrades to
//! pass-through. These errors only surface while validating configuration,
//! parsing match patterns, or decoding a viewer handshake.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterceptError {
    /// The configured viewer page is not an absolute URL.
    #[error("invalid viewer URL `{url}`: {source}")]
    InvalidViewerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The viewer page must not carry its own query or fragment; `?file=` is appended to it.
    #[error("viewer URL `{0}` must not contain a query or fragment")]
    ViewerUrlHasQuery(String),

    /// A URL match pattern could not be parsed.
    #[error("invalid URL pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// The JSON payload of a `set-referer` channel name was malformed.
    #[error("malformed referer handshake payload: {0}")]
    HandshakePayload(#[from] serde_json::Error),

    /// A configuration value failed validation.
    #[error("invalid config: {0}")]
    Config(String),
}
