//! Request interception and referer propagation for an in-browser PDF viewer.
//!
//! The browser's extension event system is modelled as an abstract bus: the
//! host feeds [`events::BrowserEvent`]s into an [`interceptor::Interceptor`]
//! and applies the returned [`events::Dispatch`] (a blocking response plus
//! side actions). Nothing here touches disk or the network.

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod header_cache;
pub mod headers;
pub mod interceptor;
pub mod listeners;
pub mod logging;
pub mod model;
pub mod pattern;
pub mod sticking;
pub mod viewer_url;

pub use capability::Capabilities;
pub use config::InterceptConfig;
pub use error::InterceptError;
pub use events::{Action, BlockingResponse, BrowserEvent, Dispatch};
pub use interceptor::Interceptor;
