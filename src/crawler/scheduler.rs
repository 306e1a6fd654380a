//! Per-host politeness scheduling
//!
//! Every request to a host, robots.txt included, first calls
//! [`PolitenessScheduler::acquire`]. Consecutive request starts to one host are
//! spaced by at least the effective delay; different hosts never wait on each
//! other because each host has its own lock.

use crate::config::CrawlerConfig;
use crate::state::{HostState, HostStateTable};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces the minimum spacing between requests to the same host
#[derive(Debug)]
pub struct PolitenessScheduler {
    /// Shared per-host state
    hosts: Arc<HostStateTable>,

    /// Configured delay, resolved once for the run
    delay: Duration,

    /// Whether robots.txt `Crawl-delay` may raise the spacing
    honor_crawl_delay: bool,

    /// Product token used to look up `Crawl-delay`
    agent: String,
}

impl PolitenessScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `hosts` - Host state table shared with the robots filter
    /// * `config` - Crawler configuration; a delay range is sampled here, once
    /// * `agent` - robots.txt product token
    pub fn new(hosts: Arc<HostStateTable>, config: &CrawlerConfig, agent: impl Into<String>) -> Self {
        Self::with_delay(
            hosts,
            config.politeness_delay_ms.resolve(),
            config.honor_crawl_delay,
            agent,
        )
    }

    /// Creates a scheduler with an already-resolved delay
    pub fn with_delay(
        hosts: Arc<HostStateTable>,
        delay: Duration,
        honor_crawl_delay: bool,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            hosts,
            delay,
            honor_crawl_delay,
            agent: agent.into(),
        }
    }

    /// Configured delay for this run
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Blocks until a request to `host` may start, then reserves the next slot
    ///
    /// The host lock is held across the sleep so that concurrent callers for the
    /// same host are released one at a time, each at least one delay apart.
    pub async fn acquire(&self, host: &str) {
        let state = self.hosts.get_or_create(host);
        let delay = self.effective_delay(&state);

        let mut next_allowed = state.next_allowed.lock().await;
        if let Some(at) = *next_allowed {
            if at > Instant::now() {
                tracing::trace!("waiting {:?} for host {}", at - Instant::now(), host);
                tokio::time::sleep_until(at).await;
            }
        }
        *next_allowed = Some(Instant::now() + delay);
    }

    /// Spacing for a host: the configured delay, raised to the robots.txt
    /// `Crawl-delay` when enabled and the host's policy is already cached
    pub fn effective_delay(&self, state: &HostState) -> Duration {
        if !self.honor_crawl_delay {
            return self.delay;
        }
        let robots_delay = state
            .cached_robots()
            .and_then(|robots| robots.crawl_delay(&self.agent))
            .unwrap_or(Duration::ZERO);

        self.delay.max(robots_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::{CachedRobots, ParsedRobots, MAX_CRAWL_DELAY};

    fn scheduler(delay_ms: u64, honor: bool) -> PolitenessScheduler {
        PolitenessScheduler::with_delay(
            Arc::new(HostStateTable::new()),
            Duration::from_millis(delay_ms),
            honor,
            "TestBot",
        )
    }

    fn host_with_robots(content: &str) -> HostState {
        let state = HostState::new("example.com");
        state
            .robots
            .set(CachedRobots::new(ParsedRobots::from_content(content)))
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let scheduler = scheduler(500, false);
        let start = Instant::now();
        scheduler.acquire("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_same_host_is_spaced() {
        let scheduler = scheduler(100, false);
        let start = Instant::now();
        scheduler.acquire("example.com").await;
        scheduler.acquire("example.com").await;
        scheduler.acquire("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_different_hosts_do_not_wait() {
        let scheduler = scheduler(500, false);
        let start = Instant::now();
        scheduler.acquire("a.example.com").await;
        scheduler.acquire("b.example.com").await;
        scheduler.acquire("c.example.com").await;
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_are_serialized() {
        let scheduler = Arc::new(scheduler(80, false));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let scheduler = Arc::clone(&scheduler);
            handles.push(tokio::spawn(async move {
                scheduler.acquire("example.com").await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(75));
        }
        assert!(start.elapsed() >= Duration::from_millis(240));
    }

    #[test]
    fn test_effective_delay_uses_config() {
        let scheduler = scheduler(1000, true);
        let state = HostState::new("example.com");
        assert_eq!(scheduler.effective_delay(&state), Duration::from_millis(1000));
    }

    #[test]
    fn test_effective_delay_with_robots_delay() {
        let scheduler = scheduler(1000, true);
        let state = host_with_robots("User-agent: *\nCrawl-delay: 5\nDisallow: /admin");
        assert_eq!(scheduler.effective_delay(&state), Duration::from_secs(5));
    }

    #[test]
    fn test_effective_delay_robots_smaller_than_config() {
        let scheduler = scheduler(1000, true);
        let state = host_with_robots("User-agent: *\nCrawl-delay: 0.5");
        assert_eq!(scheduler.effective_delay(&state), Duration::from_millis(1000));
    }

    #[test]
    fn test_effective_delay_huge_robots_delay_is_capped() {
        let scheduler = scheduler(1000, true);
        let state = host_with_robots("User-agent: *\nCrawl-delay: 1e30\n");
        assert_eq!(scheduler.effective_delay(&state), MAX_CRAWL_DELAY);
    }

    #[test]
    fn test_crawl_delay_ignored_unless_enabled() {
        let scheduler = scheduler(200, false);
        let state = host_with_robots("User-agent: *\nCrawl-delay: 5");
        assert_eq!(scheduler.effective_delay(&state), Duration::from_millis(200));
    }
}
