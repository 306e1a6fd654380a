//! Robots.txt parser
//!
//! Allow/disallow matching is delegated to the robotstxt crate. The
//! `Crawl-delay` extension is not handled by that crate, so it is read here.

use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::Duration;

/// Parsed robots.txt policy for one host
///
/// An absent body means "allow everything": used when robots.txt is missing,
/// unreachable or answered with an error status.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    body: Option<Arc<str>>,
}

impl ParsedRobots {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::allow_all();
        }
        Self {
            body: Some(Arc::from(content)),
        }
    }

    /// Creates a permissive policy that allows everything
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    /// Returns true if this policy never disallows anything
    pub fn is_allow_all(&self) -> bool {
        self.body.is_none()
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL (or path) to check
    /// * `user_agent` - Product token, e.g. the crawler name
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url)
            }
        }
    }

    /// Returns the `Crawl-delay` that applies to `user_agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let body = self.body.as_deref()?;
        let agent = user_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // consecutive user-agent lines share one group
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Some(delay) = parse_delay(value) else {
                        continue;
                    };
                    if group
                        .iter()
                        .any(|ua| ua != "*" && !ua.is_empty() && agent.contains(ua.as_str()))
                    {
                        specific.get_or_insert(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard.get_or_insert(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        specific.or(wildcard)
    }
}

/// Longest `Crawl-delay` honored; larger values are clamped
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(120);

fn parse_delay(value: &str) -> Option<Duration> {
    let secs: f64 = value.parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let delay = Duration::try_from_secs_f64(secs).unwrap_or(MAX_CRAWL_DELAY);
    Some(delay.min(MAX_CRAWL_DELAY))
}
