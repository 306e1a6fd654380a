use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages dequeued from the frontier in one run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum depth to crawl from seed URLs (seeds are depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: PolitenessDelay,

    /// Whether non-HTML documents (images, PDFs, Word files) produce visit records
    #[serde(rename = "include-binary-content", default = "default_true")]
    pub include_binary_content: bool,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Optional deadline for the whole crawl (seconds)
    #[serde(rename = "crawl-timeout-secs", default)]
    pub crawl_timeout_secs: Option<u64>,

    /// Raise per-host spacing to the robots.txt Crawl-delay when it is larger
    #[serde(rename = "honor-crawl-delay", default)]
    pub honor_crawl_delay: bool,
}

/// Politeness delay, either fixed or drawn once per run from a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PolitenessDelay {
    Fixed(u64),
    Range { min: u64, max: u64 },
}

impl PolitenessDelay {
    /// Resolves the delay for a crawl run
    ///
    /// A range is sampled once; every request in the run then uses the same value.
    pub fn resolve(&self) -> Duration {
        match *self {
            Self::Fixed(ms) => Duration::from_millis(ms),
            Self::Range { min, max } if min >= max => Duration::from_millis(min),
            Self::Range { min, max } => {
                Duration::from_millis(rand::thread_rng().gen_range(min..=max))
            }
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler (also the robots.txt product token)
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Crawl scope: where to start and what may be fetched
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Seed URLs, enqueued at depth 0
    pub seeds: Vec<String>,

    /// Domain allow-list; a host matches a domain or any subdomain of it
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// File extensions never fetched (matched against the URL path)
    #[serde(rename = "excluded-extensions", default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV record streams and the text report
    pub directory: String,

    /// Label used in output file names, e.g. `fetch_<label>.csv`
    #[serde(rename = "site-label")]
    pub site_label: String,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

/// Extensions excluded from fetching when the config does not list any
pub fn default_excluded_extensions() -> Vec<String> {
    [".css", ".js", ".json", ".mp3", ".zip", ".gz"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
