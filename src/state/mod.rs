//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: lifecycle of a crawl run (running, draining, stopped)
//! - `HostState`: per-host politeness timestamp and robots.txt cache slot
//! - `HostStateTable`: concurrent map from host key to `HostState`

mod crawl_phase;
mod host_state;

pub use crawl_phase::CrawlPhase;
pub use host_state::{HostState, HostStateTable};
