//! Crawler module: the crawl engine
//!
//! - `frontier`: FIFO work queue, visited set, termination detection
//! - `scheduler`: per-host politeness spacing
//! - `fetcher`: transport traits and the reqwest implementation
//! - `parser`: HTML link extraction
//! - `classifier`: response classification and fetch statuses
//! - `policy`: link-following decisions and statistics hooks
//! - `coordinator`: the worker pool

mod classifier;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod policy;
mod scheduler;

pub use classifier::{
    normalize_content_type, FetchOutcome, FetchStatus, PageClassifier, PageContent,
    SENTINEL_STATUS,
};
pub use coordinator::Coordinator;
pub use fetcher::{
    build_http_client, FetchError, FetchResponse, HttpFetcher, PageFetcher, RobotsFetcher,
};
pub use frontier::{Frontier, InFlightGuard, StopHandle, UrlRecord, VisitedSet};
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use policy::{CrawlPolicy, StatsPolicy};
pub use scheduler::PolitenessScheduler;

use crate::config::Config;
use crate::output::CrawlStatsSnapshot;
use crate::Result;

/// Runs a complete crawl over HTTP
///
/// Validates the configuration, seeds the frontier, runs the worker pool to
/// completion and returns the statistics snapshot.
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlStatsSnapshot)` - Crawl ran; statistics may include failed fetches
/// * `Err(TidemarkError)` - The crawl could not start
pub async fn crawl(config: Config) -> Result<CrawlStatsSnapshot> {
    Coordinator::new(config)?.run().await
}
