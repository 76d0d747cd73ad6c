//! Successor detection and self-deactivation.
//!
//! A [`poller::LivenessPoller`] probes for the successor viewer in the
//! background and, on request, in short bursts. Once the successor is found the
//! host runs a [`deactivate::Deactivator`], which stops interception, moves
//! open viewer tabs back to their original URLs and uninstalls the extension.

pub mod config;
pub mod deactivate;
pub mod poller;
pub mod probe;

pub use config::MigrationConfig;
pub use deactivate::{DeactivationReport, Deactivator, ExtensionHost, ViewerTab};
pub use poller::{LivenessPoller, PollOutcome, PollerHandle};
pub use probe::SuccessorProbe;
