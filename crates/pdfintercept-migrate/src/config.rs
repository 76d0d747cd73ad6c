use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Liveness poller settings. Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Web-accessible resource of the successor; loading it proves installation.
    pub successor_probe_url: String,
    /// Deadline for one probe.
    pub probe_timeout_ms: u64,
    /// Period of the always-on background probe.
    pub background_poll_secs: u64,
    /// Period of the burst probe started by a watch request.
    pub watch_poll_secs: u64,
    /// How long a burst watch lasts.
    pub watch_duration_secs: u64,
    /// Log a failure summary every this many failed probes (0 disables).
    pub failure_log_every: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            successor_probe_url: concat!(
                "chrome-extension://oemmndcbldboiebfnladdacbdfmadadm",
                "/patch-worker.js"
            )
            .to_string(),
            probe_timeout_ms: 1000,
            background_poll_secs: 60,
            watch_poll_secs: 5,
            watch_duration_secs: 600,
            failure_log_every: 20,
        }
    }
}

impl MigrationConfig {
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: MigrationConfig = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            bail!("probe_timeout_ms must be greater than zero");
        }
        if self.background_poll_secs == 0 || self.watch_poll_secs == 0 {
            bail!("poll intervals must be greater than zero");
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_poll_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_poll_secs)
    }

    /// Number of burst probes in one watch, rounded up.
    pub fn watch_ticks(&self) -> u64 {
        self.watch_duration_secs.div_ceil(self.watch_poll_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = MigrationConfig::default();
        assert_eq!(cfg.probe_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.background_interval(), Duration::from_secs(60));
        assert_eq!(cfg.watch_ticks(), 120);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = MigrationConfig::from_toml_str("watch_poll_secs = 7\n").unwrap();
        assert_eq!(cfg.watch_poll_secs, 7);
        assert_eq!(cfg.watch_ticks(), 86);
        assert_eq!(cfg.failure_log_every, 20);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(MigrationConfig::from_toml_str("background_poll_secs = 0").is_err());
    }
}
