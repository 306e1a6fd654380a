use crate::robots::CachedRobots;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

/// Tracks the state of one host during crawling
///
/// Holds the earliest instant the next request to this host may start and the
/// host's robots.txt policy, fetched at most once per run.
#[derive(Debug)]
pub struct HostState {
    /// Host key (`host[:port]`)
    pub host: String,

    /// Earliest start time for the next request; `None` before the first one
    pub next_allowed: Mutex<Option<Instant>>,

    /// robots.txt policy, initialized by the first worker that needs it
    pub robots: OnceCell<CachedRobots>,
}

impl HostState {
    /// Creates state for a host that has not been contacted yet
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            next_allowed: Mutex::new(None),
            robots: OnceCell::new(),
        }
    }

    /// Returns the cached robots policy if it has been fetched
    pub fn cached_robots(&self) -> Option<&CachedRobots> {
        self.robots.get()
    }
}

/// Concurrent host key -> `HostState` map shared by the scheduler and robots filter
#[derive(Debug, Default)]
pub struct HostStateTable {
    hosts: DashMap<String, Arc<HostState>>,
}

impl HostStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `host`, creating it on first use
    ///
    /// The `Arc` is cloned out so no map shard lock is held by the caller.
    pub fn get_or_create(&self, host: &str) -> Arc<HostState> {
        if let Some(existing) = self.hosts.get(host) {
            return Arc::clone(existing.value());
        }
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HostState::new(host)))
            .value()
            .clone()
    }

    /// Number of hosts contacted so far
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::ParsedRobots;

    #[test]
    fn test_new_host_state() {
        let state = HostState::new("example.com");
        assert_eq!(state.host, "example.com");
        assert!(state.cached_robots().is_none());
    }

    #[test]
    fn test_get_or_create_returns_same_entry() {
        let table = HostStateTable::new();
        let a = table.get_or_create("example.com");
        let b = table.get_or_create("example.com");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_distinct_hosts() {
        let table = HostStateTable::new();
        table.get_or_create("a.example.com");
        table.get_or_create("b.example.com");
        table.get_or_create("127.0.0.1:8080");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get_or_create("127.0.0.1:8080").host, "127.0.0.1:8080");
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn test_next_allowed_starts_empty() {
        let state = HostState::new("example.com");
        assert!(state.next_allowed.lock().await.is_none());

        let now = Instant::now();
        *state.next_allowed.lock().await = Some(now);
        assert_eq!(*state.next_allowed.lock().await, Some(now));
    }

    #[tokio::test]
    async fn test_robots_initialized_once() {
        let state = HostState::new("example.com");
        let first = state
            .robots
            .get_or_init(|| async { CachedRobots::new(ParsedRobots::from_content("User-agent: *\nDisallow: /")) })
            .await;
        assert!(!first.is_allowed("https://example.com/page", "TestBot"));

        let second = state
            .robots
            .get_or_init(|| async { CachedRobots::new(ParsedRobots::allow_all()) })
            .await;
        assert!(!second.is_allowed("https://example.com/page", "TestBot"));
    }
}
