use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::InterceptError;
use crate::viewer_url::ViewerUrl;

/// Engine configuration embedded by the host (there is no config file).
///
/// Every field has a default, so a TOML snippet only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Absolute URL of the internal viewer page, without query or fragment.
    pub viewer_url: String,
    /// Substring in a resource URL that requests a download instead of the viewer.
    pub download_marker: String,
    /// Channel name the viewer opens to signal that it is alive.
    pub alive_channel: String,
    /// Channel name prefix of the viewer's referer handshake; a JSON payload follows it.
    pub referer_channel_prefix: String,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            viewer_url: concat!(
                "chrome-extension://oemmndcbldboiebfnladdacbdfmadadm",
                "/content/web/viewer.html"
            )
            .to_string(),
            download_marker: "pdfjs.action=download".to_string(),
            alive_channel: "chromecom-is-alive".to_string(),
            referer_channel_prefix: "set-referer".to_string(),
        }
    }
}

impl InterceptConfig {
    /// Parse and validate a TOML snippet.
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: InterceptConfig = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), InterceptError> {
        self.viewer()?;
        if self.alive_channel.is_empty() {
            return Err(InterceptError::Config("alive_channel must not be empty".into()));
        }
        if self.referer_channel_prefix.is_empty() {
            return Err(InterceptError::Config(
                "referer_channel_prefix must not be empty".into(),
            ));
        }
        if self.alive_channel.starts_with(&self.referer_channel_prefix) {
            return Err(InterceptError::Config(
                "alive_channel must not start with referer_channel_prefix".into(),
            ));
        }
        Ok(())
    }

    pub fn viewer(&self) -> Result<ViewerUrl, InterceptError> {
        ViewerUrl::new(&self.viewer_url)
    }
}
