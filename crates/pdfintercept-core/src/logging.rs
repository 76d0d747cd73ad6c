//! Logging init: structured `tracing` output on stderr.
//!
//! The engine keeps no on-disk state, so there is no log file; hosts that want
//! one install their own subscriber instead of calling these.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,pdfintercept_core=debug,pdfintercept_migrate=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Fails if one is already installed, so the
/// caller can decide whether that matters.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!("pdfintercept logging initialized");
    Ok(())
}

/// Like [`init_logging`] but silently keeps an existing subscriber.
pub fn init_logging_once() {
    let _ = init_logging();
}
