//! Crawl statistics aggregation
//!
//! Three tables keyed by URL string, written concurrently by workers. A
//! repeated write for the same URL replaces the earlier entry.

use crate::crawler::{FetchOutcome, FetchStatus};
use crate::url::UrlScope;
use dashmap::DashMap;
use url::Url;

/// One row of the fetch record stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    pub url: String,
    /// HTTP status, or 0 for a fetch with no usable response
    pub status: u16,
}

/// One row of the visit record stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub url: String,
    pub size: u64,
    pub outlinks: usize,
    pub content_type: String,
}

/// One row of the URL scope record stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlScopeRecord {
    pub url: String,
    pub scope: UrlScope,
}

#[derive(Debug, Clone)]
struct VisitEntry {
    size: u64,
    outlinks: usize,
    content_type: String,
}

/// Point-in-time copy of all three tables, each sorted by URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatsSnapshot {
    pub fetches: Vec<FetchRecord>,
    pub visits: Vec<VisitRecord>,
    pub urls: Vec<UrlScopeRecord>,
}

impl CrawlStatsSnapshot {
    pub fn fetch_status(&self, url: &str) -> Option<u16> {
        self.fetches.iter().find(|r| r.url == url).map(|r| r.status)
    }

    pub fn visit(&self, url: &str) -> Option<&VisitRecord> {
        self.visits.iter().find(|r| r.url == url)
    }

    pub fn url_scope(&self, url: &str) -> Option<UrlScope> {
        self.urls.iter().find(|r| r.url == url).map(|r| r.scope)
    }

    /// Sorts every table by URL
    pub fn sort(&mut self) {
        self.fetches.sort_by(|a, b| a.url.cmp(&b.url));
        self.visits.sort_by(|a, b| a.url.cmp(&b.url));
        self.urls.sort_by(|a, b| a.url.cmp(&b.url));
    }
}

/// Concurrent collector for fetch, visit and URL-scope statistics
#[derive(Debug, Default)]
pub struct StatsAggregator {
    fetches: DashMap<String, FetchStatus>,
    visits: DashMap<String, VisitEntry>,
    urls: DashMap<String, UrlScope>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the status of a fetch attempt
    pub fn record_fetch(&self, url: &Url, status: FetchStatus) {
        self.fetches.insert(url.as_str().to_string(), status);
    }

    /// Records a visit for a classified 2xx response
    pub fn record_visit(&self, outcome: &FetchOutcome) {
        let entry = VisitEntry {
            size: outcome.byte_size.unwrap_or(0),
            outlinks: outcome.outlink_count.unwrap_or(0),
            content_type: outcome.content_type.clone().unwrap_or_default(),
        };
        self.visits.insert(outcome.url.as_str().to_string(), entry);
    }

    /// Records the scope indicator for a discovered URL
    pub fn record_url(&self, url: &Url, scope: UrlScope) {
        self.urls.insert(url.as_str().to_string(), scope);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.len()
    }

    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    /// Copies all three tables out, sorted by URL
    ///
    /// Intended to be called once the worker pool has joined.
    pub fn snapshot(&self) -> CrawlStatsSnapshot {
        let mut snapshot = CrawlStatsSnapshot {
            fetches: self
                .fetches
                .iter()
                .map(|e| FetchRecord {
                    url: e.key().clone(),
                    status: e.value().code(),
                })
                .collect(),
            visits: self
                .visits
                .iter()
                .map(|e| VisitRecord {
                    url: e.key().clone(),
                    size: e.value().size,
                    outlinks: e.value().outlinks,
                    content_type: e.value().content_type.clone(),
                })
                .collect(),
            urls: self
                .urls
                .iter()
                .map(|e| UrlScopeRecord {
                    url: e.key().clone(),
                    scope: *e.value(),
                })
                .collect(),
        };
        snapshot.sort();
        snapshot
    }
}
