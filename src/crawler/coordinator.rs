//! Crawler coordinator - worker pool orchestration
//!
//! A fixed pool of tokio tasks shares one frontier, one host state table and
//! one statistics aggregator. Each worker loops:
//!
//! 1. Dequeue a record (parks while other workers may still add links)
//! 2. Check robots.txt for the record's host
//! 3. Wait for the host's politeness slot
//! 4. Fetch, record the status, classify 2xx bodies
//! 5. Offer discovered links to the crawl policy and enqueue the eligible ones
//!
//! The pool stops when the frontier is exhausted with nothing in flight, the
//! page budget is spent, or a stop is requested (deadline, Ctrl-C, caller).

use crate::config::{validate, Config};
use crate::crawler::classifier::{FetchStatus, PageClassifier};
use crate::crawler::fetcher::{FetchError, FetchResponse, HttpFetcher, PageFetcher, RobotsFetcher};
use crate::crawler::frontier::{Frontier, InFlightGuard, StopHandle, UrlRecord};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::policy::{CrawlPolicy, StatsPolicy};
use crate::crawler::scheduler::PolitenessScheduler;
use crate::output::{CrawlStatsSnapshot, StatsAggregator};
use crate::robots::RobotsFilter;
use crate::state::HostStateTable;
use crate::url::{host_key, parse_crawl_url, ScopePolicy};
use crate::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Log a progress line every this many processed records
const PROGRESS_INTERVAL: usize = 100;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    frontier: Arc<Frontier>,
    scheduler: Arc<PolitenessScheduler>,
    robots: Arc<RobotsFilter>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    policy: Arc<dyn CrawlPolicy>,
    stats: Arc<StatsAggregator>,
    seed_count: usize,
}

impl Coordinator {
    /// Creates a coordinator that talks HTTP through reqwest
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run, seeds enqueued
    /// * `Err(TidemarkError)` - Invalid configuration or HTTP client failure
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let transport = Arc::new(HttpFetcher::from_config(&config.user_agent, &config.crawler)?);
        Self::with_transport(config, transport.clone(), transport)
    }

    /// Creates a coordinator with caller-supplied transports
    ///
    /// The configuration is validated and every seed parsed before anything
    /// else happens; a malformed seed fails here.
    pub fn with_transport(
        config: Config,
        pages: Arc<dyn PageFetcher>,
        robots: Arc<dyn RobotsFetcher>,
    ) -> Result<Self> {
        validate(&config)?;

        let seeds = config
            .scope
            .seeds
            .iter()
            .map(|seed| parse_crawl_url(seed))
            .collect::<std::result::Result<Vec<Url>, _>>()?;

        let agent = config.user_agent.crawler_name.clone();
        let hosts = Arc::new(HostStateTable::new());
        let scheduler = Arc::new(PolitenessScheduler::new(
            Arc::clone(&hosts),
            &config.crawler,
            agent.clone(),
        ));
        let robots = Arc::new(RobotsFilter::new(
            hosts,
            Arc::clone(&scheduler),
            robots,
            agent,
        ));

        let stats = Arc::new(StatsAggregator::new());
        let policy = Arc::new(StatsPolicy::new(
            ScopePolicy::from_config(&config.scope),
            Arc::clone(&stats),
        ));

        let frontier = Arc::new(Frontier::new(
            config.crawler.max_depth,
            config.crawler.max_pages,
        ));
        let mut seed_count = 0;
        for seed in seeds {
            if frontier.enqueue(UrlRecord::seed(seed)) {
                seed_count += 1;
            }
        }

        Ok(Self {
            config: Arc::new(config),
            frontier,
            scheduler,
            robots,
            fetcher: pages,
            extractor: Arc::new(HtmlLinkExtractor),
            policy,
            stats,
            seed_count,
        })
    }

    /// Replaces the default scope/statistics policy
    ///
    /// The snapshot returned by [`Coordinator::run`] only contains what the
    /// supplied policy writes into [`Coordinator::stats`].
    pub fn with_policy(mut self, policy: Arc<dyn CrawlPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Handle for requesting an early stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.frontier))
    }

    /// Statistics tables the default policy writes to
    pub fn stats(&self) -> Arc<StatsAggregator> {
        Arc::clone(&self.stats)
    }

    /// Runs the crawl to completion and returns the final statistics
    ///
    /// Per-fetch failures never abort the run; they are recorded as statuses.
    pub async fn run(self) -> Result<CrawlStatsSnapshot> {
        let worker_count = self.config.crawler.worker_count;
        tracing::info!(
            "Starting crawl: {} seed(s), {} worker(s), max {} pages, max depth {}, delay {:?}",
            self.seed_count,
            worker_count,
            self.config.crawler.max_pages,
            self.config.crawler.max_depth,
            self.scheduler.delay()
        );

        let deadline = self.config.crawler.crawl_timeout_secs.map(|secs| {
            let stop = self.stop_handle();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                tracing::warn!("Crawl timeout of {}s reached", secs);
                stop.stop();
            })
        });

        let ctx = Arc::new(WorkerContext {
            frontier: Arc::clone(&self.frontier),
            scheduler: Arc::clone(&self.scheduler),
            robots: Arc::clone(&self.robots),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            policy: Arc::clone(&self.policy),
            classifier: PageClassifier::new(self.config.crawler.include_binary_content),
            processed: AtomicUsize::new(0),
            started: Instant::now(),
        });

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(run_worker(Arc::clone(&ctx), id));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }
        self.frontier.finish()?;

        let snapshot = self.stats.snapshot();
        tracing::info!(
            "Crawl finished in {:?}: {} dequeued, {} fetches, {} visits, {} urls",
            ctx.started.elapsed(),
            self.frontier.pages_dequeued(),
            snapshot.fetches.len(),
            snapshot.visits.len(),
            snapshot.urls.len()
        );

        Ok(snapshot)
    }
}

/// Everything a worker task shares with its peers
struct WorkerContext {
    frontier: Arc<Frontier>,
    scheduler: Arc<PolitenessScheduler>,
    robots: Arc<RobotsFilter>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    policy: Arc<dyn CrawlPolicy>,
    classifier: PageClassifier,
    processed: AtomicUsize,
    started: Instant,
}

async fn run_worker(ctx: Arc<WorkerContext>, id: usize) {
    tracing::debug!("Worker {} started", id);

    while let Some(record) = ctx.frontier.dequeue().await {
        let _in_flight = InFlightGuard::new(&ctx.frontier);
        ctx.process(&record).await;
        ctx.report_progress();
    }

    tracing::debug!("Worker {} exiting", id);
}

impl WorkerContext {
    async fn process(&self, record: &UrlRecord) {
        let url = &record.url;
        let Some(host) = host_key(url) else {
            tracing::warn!("Skipping URL without host: {}", url);
            return;
        };

        // robots first: its own fetch takes a politeness slot, so acquiring
        // here first would let two requests to this host start within one delay
        if !self.robots.is_allowed(url).await {
            return;
        }

        self.scheduler.acquire(&host).await;
        tracing::debug!("Fetching {} (depth {})", url, record.depth);

        match self.fetcher.fetch(url).await {
            Ok(response) => self.handle_response(record, &response),
            Err(FetchError::Content { status, message }) => {
                tracing::warn!("Body of {} unreadable after {}: {}", url, status, message);
                self.policy.on_status(url, FetchStatus::ContentError);
            }
            Err(FetchError::Transport(message)) => {
                tracing::warn!("Fetch of {} failed: {}", url, message);
                self.policy.on_status(url, FetchStatus::TransportError);
            }
        }
    }

    fn handle_response(&self, record: &UrlRecord, response: &FetchResponse) {
        let url = &record.url;
        self.policy.on_status(url, FetchStatus::Http(response.status));

        if response.is_success() {
            let (outcome, content) = self
                .classifier
                .classify(url, response, self.extractor.as_ref());
            self.policy.on_visit(&outcome, &content);

            let mut queued = 0;
            for link in content.outlinks() {
                if self.policy.should_visit(record, link)
                    && self.frontier.enqueue(record.child(link.clone()))
                {
                    queued += 1;
                }
            }
            tracing::debug!(
                "{}: {} outlinks, {} queued",
                url,
                content.outlinks().len(),
                queued
            );
        } else if response.is_redirect() {
            self.follow_redirect(record, response.location.as_deref());
        } else {
            tracing::debug!("{} returned {}", url, response.status);
        }
    }

    /// Treats a redirect target as a link discovered at the same depth
    fn follow_redirect(&self, record: &UrlRecord, location: Option<&str>) {
        let Some(mut target) = location.and_then(|loc| record.url.join(loc.trim()).ok()) else {
            tracing::debug!("{} redirected without a usable Location", record.url);
            return;
        };
        target.set_fragment(None);

        if target.scheme() != "http" && target.scheme() != "https" {
            return;
        }

        tracing::debug!("{} redirects to {}", record.url, target);
        if self.policy.should_visit(record, &target) {
            self.frontier.enqueue(record.redirect(target));
        }
    }

    fn report_progress(&self) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % PROGRESS_INTERVAL == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                processed as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                processed,
                self.frontier.len(),
                rate
            );
        }
    }
}
