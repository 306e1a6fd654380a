use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};

/// A host's robots.txt policy together with when it was obtained
///
/// Entries live for the whole run; a crawl never re-fetches robots.txt.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed policy
    pub content: ParsedRobots,

    /// When the policy was fetched (or defaulted)
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps a policy, stamping it with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<std::time::Duration> {
        self.content.crawl_delay(user_agent)
    }
}
