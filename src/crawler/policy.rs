//! Crawl policy hooks
//!
//! The worker pool asks a [`CrawlPolicy`] whether to follow each discovered
//! link and reports every fetch and visit to it. [`StatsPolicy`] is the
//! default: it applies the scope rules and feeds the statistics tables.

use crate::crawler::classifier::{FetchOutcome, FetchStatus, PageContent};
use crate::crawler::frontier::UrlRecord;
use crate::output::StatsAggregator;
use crate::url::ScopePolicy;
use std::sync::Arc;
use url::Url;

/// Decisions and callbacks invoked by the worker pool
pub trait CrawlPolicy: Send + Sync {
    /// Called for every URL discovered on `from` (outlinks and redirect targets).
    /// Returning false keeps the URL out of the frontier.
    fn should_visit(&self, from: &UrlRecord, url: &Url) -> bool;

    /// Called after a 2xx response has been classified
    fn on_visit(&self, outcome: &FetchOutcome, content: &PageContent);

    /// Called once per fetch attempt with its final status
    fn on_status(&self, url: &Url, status: FetchStatus);
}

/// Scope-filtering policy that records all three statistics tables
#[derive(Debug, Clone)]
pub struct StatsPolicy {
    scope: ScopePolicy,
    stats: Arc<StatsAggregator>,
}

impl StatsPolicy {
    pub fn new(scope: ScopePolicy, stats: Arc<StatsAggregator>) -> Self {
        Self { scope, stats }
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }
}

impl CrawlPolicy for StatsPolicy {
    fn should_visit(&self, from: &UrlRecord, url: &Url) -> bool {
        let decision = self.scope.classify(url);
        self.stats.record_url(url, decision.scope());

        if !decision.is_eligible() {
            tracing::trace!(
                "Not following {} from {} (in_scope={}, excluded={})",
                url,
                from.url,
                decision.in_scope,
                decision.excluded
            );
        }
        decision.is_eligible()
    }

    fn on_visit(&self, outcome: &FetchOutcome, content: &PageContent) {
        if content.is_recordable() {
            self.stats.record_visit(outcome);
        }
    }

    fn on_status(&self, url: &Url, status: FetchStatus) {
        self.stats.record_fetch(url, status);
    }
}
