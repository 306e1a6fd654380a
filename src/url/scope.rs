use crate::config::ScopeConfig;
use crate::url::domain::extract_host;
use crate::url::matcher::matches_domain;
use url::Url;

/// Whether a URL lies inside the crawl's domain allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlScope {
    InScope,
    OutOfScope,
}

impl UrlScope {
    /// Indicator written to the URL record stream
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::InScope => "OK",
            Self::OutOfScope => "N_OK",
        }
    }

    /// Parses an indicator, accepting both the short and the long spelling
    pub fn from_indicator(s: &str) -> Option<Self> {
        match s.trim() {
            "OK" | "IN_SCOPE" => Some(Self::InScope),
            "N_OK" | "OUT_OF_SCOPE" => Some(Self::OutOfScope),
            _ => None,
        }
    }
}

/// Outcome of running a URL through the scope policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeDecision {
    /// Host matches the allow-list
    pub in_scope: bool,
    /// Path ends in a denied extension
    pub excluded: bool,
}

impl ScopeDecision {
    /// A URL is fetched only when in scope and not excluded
    pub fn is_eligible(&self) -> bool {
        self.in_scope && !self.excluded
    }

    /// Scope indicator for urlStats; exclusion does not affect it
    pub fn scope(&self) -> UrlScope {
        if self.in_scope {
            UrlScope::InScope
        } else {
            UrlScope::OutOfScope
        }
    }
}

/// Pure decision logic for discovered URLs
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    allowed_domains: Vec<String>,
    excluded_extensions: Vec<String>,
}

impl ScopePolicy {
    /// Creates a policy; domains and extensions are lower-cased and extensions
    /// get a leading dot if they lack one
    pub fn new<D, E>(allowed_domains: D, excluded_extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let allowed_domains = allowed_domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let excluded_extensions = excluded_extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .filter(|e| e.len() > 1)
            .collect();

        Self {
            allowed_domains,
            excluded_extensions,
        }
    }

    /// Builds the policy from the `[scope]` config section
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(&config.allowed_domains, &config.excluded_extensions)
    }

    /// Classifies a URL
    pub fn classify(&self, url: &Url) -> ScopeDecision {
        ScopeDecision {
            in_scope: self.is_in_scope(url),
            excluded: self.is_excluded(url),
        }
    }

    /// True iff the URL's host matches an allow-listed domain
    pub fn is_in_scope(&self, url: &Url) -> bool {
        match extract_host(url) {
            Some(host) => self
                .allowed_domains
                .iter()
                .any(|domain| matches_domain(domain, &host)),
            None => false,
        }
    }

    /// True iff the URL path ends with a denied extension (case-insensitive)
    pub fn is_excluded(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        self.excluded_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }
}
