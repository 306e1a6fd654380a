//! Robots.txt handling module
//!
//! Parsing (over the robotstxt crate), per-host caching, and the filter the
//! workers consult before fetching a page.

mod cache;
mod filter;
mod parser;

pub use cache::CachedRobots;
pub use filter::RobotsFilter;
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY};
