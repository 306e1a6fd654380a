use crate::crawler::{PolitenessScheduler, RobotsFetcher};
use crate::robots::{CachedRobots, ParsedRobots};
use crate::state::HostStateTable;
use crate::url::{host_key, robots_url};
use std::sync::Arc;
use url::Url;

/// Answers whether a URL may be fetched under its host's robots.txt
///
/// The policy for a host is fetched on first reference, through the politeness
/// scheduler, and cached in the host's state for the rest of the run. Concurrent
/// first references share one fetch. Any failure to obtain robots.txt allows
/// the whole host.
pub struct RobotsFilter {
    hosts: Arc<HostStateTable>,
    scheduler: Arc<PolitenessScheduler>,
    fetcher: Arc<dyn RobotsFetcher>,
    agent: String,
}

impl RobotsFilter {
    /// Creates a filter
    ///
    /// # Arguments
    ///
    /// * `hosts` - Host state table holding the cached policies
    /// * `scheduler` - Politeness scheduler the robots.txt request goes through
    /// * `fetcher` - Transport used to retrieve robots.txt
    /// * `agent` - Product token matched against `User-agent` groups
    pub fn new(
        hosts: Arc<HostStateTable>,
        scheduler: Arc<PolitenessScheduler>,
        fetcher: Arc<dyn RobotsFetcher>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            hosts,
            scheduler,
            fetcher,
            agent: agent.into(),
        }
    }

    /// Checks whether `url` is allowed, fetching its host's policy if needed
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = host_key(url) else {
            return true;
        };

        let robots = self.policy_for(&host, url).await;
        let allowed = robots.is_allowed(url.as_str(), &self.agent);
        if !allowed {
            tracing::debug!("Disallowed by robots.txt: {}", url);
        }
        allowed
    }

    /// Returns the cached policy for `host`, fetching it once
    pub async fn policy_for(&self, host: &str, url: &Url) -> CachedRobots {
        let state = self.hosts.get_or_create(host);
        state
            .robots
            .get_or_init(|| async {
                let Some(location) = robots_url(url) else {
                    return CachedRobots::new(ParsedRobots::allow_all());
                };

                self.scheduler.acquire(host).await;
                let policy = match self.fetcher.fetch_robots(&location).await {
                    Some(policy) if policy.is_allow_all() => {
                        tracing::debug!("Empty robots.txt for {}, allowing all", host);
                        policy
                    }
                    Some(policy) => {
                        tracing::debug!("Fetched robots.txt for {}", host);
                        policy
                    }
                    None => {
                        tracing::debug!("No usable robots.txt for {}, allowing all", host);
                        ParsedRobots::allow_all()
                    }
                };
                CachedRobots::new(policy)
            })
            .await
            .clone()
    }
}
