//! Liveness poller timing, on tokio's paused clock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pdfintercept_migrate::{LivenessPoller, MigrationConfig, PollOutcome, SuccessorProbe};
use tokio::time::{sleep, Instant};

#[derive(Clone, Default)]
struct FlagProbe {
    installed: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    hang: bool,
}

impl SuccessorProbe for FlagProbe {
    async fn is_successor_installed(&self, url: &str) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }
        if self.hang {
            return std::future::pending().await;
        }
        Ok(self.installed.load(Ordering::SeqCst))
    }
}

fn config() -> MigrationConfig {
    MigrationConfig::default()
}

#[tokio::test(start_paused = true)]
async fn background_probe_detects_successor() {
    let probe = FlagProbe::default();
    probe.installed.store(true, Ordering::SeqCst);
    let (poller, _handle) = LivenessPoller::new(probe.clone(), config());

    let start = Instant::now();
    assert_eq!(poller.run().await, PollOutcome::SuccessorDetected);
    assert_eq!(start.elapsed(), Duration::from_secs(60));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn burst_watch_detects_before_background_interval() {
    let probe = FlagProbe::default();
    let (poller, handle) = LivenessPoller::new(probe.clone(), config());
    assert!(handle.watch_update_status());

    let installed = probe.installed.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(12)).await;
        installed.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    assert_eq!(poller.run().await, PollOutcome::SuccessorDetected);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn burst_watch_ends_after_its_duration() {
    let probe = FlagProbe::default();
    let cfg = MigrationConfig {
        watch_duration_secs: 10,
        ..config()
    };
    let (poller, handle) = LivenessPoller::new(probe.clone(), cfg);
    handle.watch_update_status();

    let stopper = handle.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(40)).await;
        stopper.stop();
    });

    assert_eq!(poller.run().await, PollOutcome::Stopped);
    // Two burst ticks (5 s, 10 s), then nothing until the stop at 40 s.
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn unwatch_cancels_the_burst() {
    let probe = FlagProbe::default();
    let (poller, handle) = LivenessPoller::new(probe.clone(), config());
    handle.watch_update_status();

    let control = handle.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(7)).await;
        control.unwatch();
        sleep(Duration::from_secs(20)).await;
        control.stop();
    });

    assert_eq!(poller.run().await, PollOutcome::Stopped);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_probe_is_abandoned_at_the_deadline() {
    let probe = FlagProbe {
        hang: true,
        ..FlagProbe::default()
    };
    let (poller, handle) = LivenessPoller::new(probe.clone(), config());
    handle.check_now();
    handle.stop();

    let start = Instant::now();
    assert_eq!(poller.run().await, PollOutcome::Stopped);
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn check_now_detects_immediately() {
    let probe = FlagProbe::default();
    probe.installed.store(true, Ordering::SeqCst);
    let (poller, handle) = LivenessPoller::new(probe, config());
    handle.check_now();

    let start = Instant::now();
    assert_eq!(poller.run().await, PollOutcome::SuccessorDetected);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn handle_reports_a_finished_poller() {
    let probe = FlagProbe::default();
    let (poller, handle) = LivenessPoller::new(probe, config());
    handle.stop();
    assert_eq!(poller.run().await, PollOutcome::Stopped);
    assert!(!handle.check_now());
}

#[tokio::test(start_paused = true)]
async fn every_check_loads_the_configured_resource() {
    let probe = FlagProbe::default();
    let cfg = MigrationConfig {
        successor_probe_url: "chrome-extension://successor/alive.js".to_string(),
        ..config()
    };
    let (poller, handle) = LivenessPoller::new(probe.clone(), cfg);
    handle.check_now();
    handle.watch_update_status();

    let stopper = handle.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(6)).await;
        stopper.stop();
    });

    assert_eq!(poller.run().await, PollOutcome::Stopped);
    let urls = probe.urls.lock().unwrap().clone();
    assert_eq!(
        urls,
        vec![
            "chrome-extension://successor/alive.js".to_string(),
            "chrome-extension://successor/alive.js".to_string(),
        ]
    );
}
