//! Viewer-to-background referer handshake channel names.
//!
//! The viewer opens a channel named `<prefix>{"url": "...", "referer": "..."}`
//! when its source page had a referrer.

use serde::{Deserialize, Serialize};

use crate::error::InterceptError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefererHandshake {
    /// Match pattern of the resource the viewer is about to fetch.
    pub url: String,
    pub referer: String,
}

impl RefererHandshake {
    /// Channel name the viewer opens for this handshake.
    pub fn channel_name(&self, prefix: &str) -> Result<String, InterceptError> {
        Ok(format!("{prefix}{}", serde_json::to_string(self)?))
    }
}

/// Decode a handshake channel name. `None` means the channel is not a
/// handshake at all; `Some(Err(_))` means it is one but the payload is broken.
pub fn parse_channel_name(
    name: &str,
    prefix: &str,
) -> Option<Result<RefererHandshake, InterceptError>> {
    let payload = name.strip_prefix(prefix)?;
    if payload.is_empty() {
        return None;
    }
    Some(serde_json::from_str(payload).map_err(InterceptError::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_payload_after_prefix() {
        let name = r#"set-referer{"url":"http://ex.com/a.pdf","referer":"http://ex.com/"}"#;
        let handshake = parse_channel_name(name, "set-referer").unwrap().unwrap();
        assert_eq!(handshake.url, "http://ex.com/a.pdf");
        assert_eq!(handshake.referer, "http://ex.com/");
    }

    #[test]
    fn other_channels_are_ignored() {
        assert!(parse_channel_name("chromecom-is-alive", "set-referer").is_none());
        assert!(parse_channel_name("set-referer", "set-referer").is_none());
    }

    #[test]
    fn broken_payload_is_an_error() {
        let result = parse_channel_name("set-referer{not json", "set-referer").unwrap();
        assert!(matches!(result, Err(InterceptError::HandshakePayload(_))));
    }

    #[test]
    fn channel_name_round_trips() {
        let handshake = RefererHandshake {
            url: "https://ex.com/a.pdf".to_string(),
            referer: "https://ex.com/page".to_string(),
        };
        let name = handshake.channel_name("set-referer").unwrap();
        assert_eq!(
            parse_channel_name(&name, "set-referer").unwrap().unwrap(),
            handshake
        );
    }
}
