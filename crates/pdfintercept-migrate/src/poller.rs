//! Liveness poller: background and burst probing for the successor.
//!
//! The background probe runs for the lifetime of the poller. A watch request
//! adds a faster burst probe for a bounded number of ticks; repeating the
//! request restarts the count without adding a second burst.

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::MigrationConfig;
use crate::probe::{probe_with_deadline, FailureCounter, SuccessorProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    Watch,
    Unwatch,
    CheckNow,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The successor answered; the caller should deactivate.
    SuccessorDetected,
    /// Stopped on request.
    Stopped,
}

/// Control side of a running [`LivenessPoller`].
#[derive(Debug, Clone)]
pub struct PollerHandle {
    tx: mpsc::UnboundedSender<PollerCommand>,
}

impl PollerHandle {
    /// Start (or extend) a burst watch. Returns false once the poller is gone.
    pub fn watch_update_status(&self) -> bool {
        self.send(PollerCommand::Watch)
    }

    pub fn unwatch(&self) -> bool {
        self.send(PollerCommand::Unwatch)
    }

    pub fn check_now(&self) -> bool {
        self.send(PollerCommand::CheckNow)
    }

    pub fn stop(&self) -> bool {
        self.send(PollerCommand::Stop)
    }

    fn send(&self, command: PollerCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

pub struct LivenessPoller<P> {
    probe: P,
    config: MigrationConfig,
    commands: mpsc::UnboundedReceiver<PollerCommand>,
    failures: FailureCounter,
}

impl<P: SuccessorProbe> LivenessPoller<P> {
    pub fn new(probe: P, config: MigrationConfig) -> (Self, PollerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let failures = FailureCounter::new(config.failure_log_every);
        (
            Self {
                probe,
                config,
                commands,
                failures,
            },
            PollerHandle { tx },
        )
    }

    /// Poll until the successor shows up or a stop is requested.
    pub async fn run(mut self) -> PollOutcome {
        let mut background = periodic(self.config.background_interval());
        let mut watch: Option<Interval> = None;
        let mut remaining: u64 = 0;
        let mut commands_open = true;

        tracing::debug!(
            url = %self.config.successor_probe_url,
            every_secs = self.config.background_poll_secs,
            "liveness poller started"
        );

        loop {
            tokio::select! {
                _ = background.tick() => {
                    if self.check().await {
                        return PollOutcome::SuccessorDetected;
                    }
                }
                _ = next_tick(&mut watch), if watch.is_some() => {
                    if self.check().await {
                        return PollOutcome::SuccessorDetected;
                    }
                    remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        watch = None;
                        tracing::debug!("update watch finished");
                    }
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(PollerCommand::Watch) => {
                        remaining = self.config.watch_ticks();
                        if watch.is_none() {
                            watch = Some(periodic(self.config.watch_interval()));
                            tracing::debug!(ticks = remaining, "watching for update");
                        }
                    }
                    Some(PollerCommand::Unwatch) => {
                        watch = None;
                        remaining = 0;
                    }
                    Some(PollerCommand::CheckNow) => {
                        if self.check().await {
                            return PollOutcome::SuccessorDetected;
                        }
                    }
                    Some(PollerCommand::Stop) => {
                        tracing::debug!("liveness poller stopped");
                        return PollOutcome::Stopped;
                    }
                    // Every handle dropped: keep the background probe running.
                    None => commands_open = false,
                },
            }
        }
    }

    async fn check(&mut self) -> bool {
        let found = probe_with_deadline(
            &self.probe,
            &self.config.successor_probe_url,
            self.config.probe_timeout(),
            &mut self.failures,
        )
        .await;
        if found {
            tracing::info!(
                url = %self.config.successor_probe_url,
                "successor extension detected"
            );
        }
        found
    }
}

/// Interval whose first tick is one period away, not immediate.
fn periodic(period: std::time::Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(watch: &mut Option<Interval>) {
    match watch {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
