//! HTTP transport for the crawler
//!
//! The worker pool talks to the network only through the [`PageFetcher`] and
//! [`RobotsFetcher`] traits. [`HttpFetcher`] implements both on top of a
//! reqwest client; tests substitute their own implementations.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::robots::ParsedRobots;
use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Raw response handed back by the transport
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header value, unmodified
    pub content_type: Option<String>,
    /// `Location` header value for redirects, unresolved
    pub location: Option<String>,
    /// Response body; only read for 2xx responses
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Failures that produce no usable HTTP response
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure before any response headers
    #[error("transport failure: {0}")]
    Transport(String),

    /// Headers arrived but the body could not be read
    #[error("content failure after status {status}: {message}")]
    Content { status: u16, message: String },
}

/// Fetches pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Issues one GET request; never follows redirects
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

/// Retrieves robots.txt policies
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    /// Fetches and parses `robots_url`
    ///
    /// Returns `None` when the file is missing or cannot be retrieved; the
    /// caller treats that as "allow everything".
    async fn fetch_robots(&self, robots_url: &Url) -> Option<ParsedRobots>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed: a 3xx is reported to the worker, which
/// enqueues the target like any other discovered link.
///
/// # Arguments
///
/// * `user_agent` - Identification sent with every request
/// * `crawler` - Supplies the per-request timeout
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout_secs);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from config and wraps it
    pub fn from_config(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, crawler)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let location = header(LOCATION);

        let body = if response.status().is_success() {
            response
                .bytes()
                .await
                .map_err(|e| FetchError::Content {
                    status,
                    message: e.to_string(),
                })?
                .to_vec()
        } else {
            Vec::new()
        };

        Ok(FetchResponse {
            status,
            content_type,
            location,
            body,
        })
    }
}

#[async_trait]
impl RobotsFetcher for HttpFetcher {
    async fn fetch_robots(&self, robots_url: &Url) -> Option<ParsedRobots> {
        let response = match self.client.get(robots_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", robots_url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "robots.txt at {} returned {}, allowing all",
                robots_url,
                response.status()
            );
            return None;
        }

        match response.text().await {
            Ok(body) => Some(ParsedRobots::from_content(&body)),
            Err(e) => {
                tracing::debug!("robots.txt body unreadable at {}: {}", robots_url, e);
                None
            }
        }
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
