//! URL handling module for Tidemark
//!
//! This module provides URL parsing, canonicalization for deduplication, host
//! extraction, domain allow-list matching, and the scope & filter policy that
//! decides which discovered URLs are eligible for fetching.

mod domain;
mod matcher;
mod normalize;
mod scope;

pub use domain::{extract_host, host_key, robots_url};
pub use matcher::matches_domain;
pub use normalize::{canonicalize, parse_crawl_url};
pub use scope::{ScopeDecision, ScopePolicy, UrlScope};
