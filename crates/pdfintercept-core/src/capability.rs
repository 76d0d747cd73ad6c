//! One-time platform capability detection.
//!
//! Capabilities are probed once when the interceptor starts and then consulted
//! by the decision engine. Routes whose capability is missing are never
//! registered, so no listener has to inspect and remove itself mid-flight.

use serde::{Deserialize, Serialize};

/// Source of platform facts, implemented by the host.
pub trait PlatformProbe {
    /// Whether a response listener can answer with a redirect URL.
    fn supports_redirect_url(&self) -> bool;
    /// Whether the platform lets extensions intercept `ftp://` navigations.
    fn supports_ftp_interception(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub redirect_url: bool,
    pub ftp_interception: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            redirect_url: true,
            ftp_interception: true,
        }
    }
}

impl Capabilities {
    pub fn detect(probe: &impl PlatformProbe) -> Self {
        let caps = Self {
            redirect_url: probe.supports_redirect_url(),
            ftp_interception: probe.supports_ftp_interception(),
        };
        tracing::info!(
            redirect_url = caps.redirect_url,
            ftp_interception = caps.ftp_interception,
            "platform capabilities detected"
        );
        caps
    }
}
