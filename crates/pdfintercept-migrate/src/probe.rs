//! Successor probe with a deadline.

use std::future::Future;
use std::time::Duration;

/// Checks whether the successor extension is installed by loading `url`, one
/// of its web-accessible resources.
pub trait SuccessorProbe {
    fn is_successor_installed(
        &self,
        url: &str,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

/// Counts failed probes and logs a summary every `log_every` failures.
#[derive(Debug)]
pub struct FailureCounter {
    failures: u64,
    log_every: u32,
}

impl FailureCounter {
    pub fn new(log_every: u32) -> Self {
        Self {
            failures: 0,
            log_every,
        }
    }

    /// Record one failure. Returns true when a summary was logged.
    pub fn record(&mut self) -> bool {
        self.failures += 1;
        if self.log_every > 0 && self.failures % u64::from(self.log_every) == 0 {
            tracing::debug!(failures = self.failures, "successor still not installed");
            return true;
        }
        false
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

/// Run one probe of `url` under `timeout`. Errors and timeouts count as "absent".
pub async fn probe_with_deadline<P: SuccessorProbe>(
    probe: &P,
    url: &str,
    timeout: Duration,
    counter: &mut FailureCounter,
) -> bool {
    match tokio::time::timeout(timeout, probe.is_successor_installed(url)).await {
        Ok(Ok(true)) => return true,
        Ok(Ok(false)) => {}
        Ok(Err(e)) => tracing::trace!(url, "successor probe failed: {}", e),
        Err(_) => tracing::trace!(
            url,
            timeout_ms = timeout.as_millis() as u64,
            "successor probe timed out"
        ),
    }
    counter.record();
    false
}
