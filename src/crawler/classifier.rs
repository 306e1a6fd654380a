//! Page classification
//!
//! Turns a transport response into a [`FetchOutcome`] plus the page content
//! the worker acts on. Only HTML bodies are parsed for outlinks.

use crate::crawler::fetcher::FetchResponse;
use crate::crawler::parser::LinkExtractor;
use std::fmt;
use url::Url;

/// Status recorded for fetches that produced no usable HTTP response
pub const SENTINEL_STATUS: u16 = 0;

const WORD_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Status of one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Response received; the code is recorded verbatim
    Http(u16),

    /// Headers received, body transfer failed
    ContentError,

    /// No response at all (connect, DNS, TLS, timeout)
    TransportError,
}

impl FetchStatus {
    /// Numeric code for the fetch record stream; both error kinds map to the sentinel
    pub fn code(&self) -> u16 {
        match self {
            Self::Http(code) => *code,
            Self::ContentError | Self::TransportError => SENTINEL_STATUS,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Http(code) if (200..300).contains(code))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Http(code) if (300..400).contains(code))
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{}", code),
            Self::ContentError => write!(f, "{} (content error)", SENTINEL_STATUS),
            Self::TransportError => write!(f, "{} (transport error)", SENTINEL_STATUS),
        }
    }
}

/// What a 2xx body turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// HTML page with its distinct outlinks
    Html { outlinks: Vec<Url> },

    /// Recordable non-HTML document (image, PDF, Word)
    Binary,

    /// Anything else; fetched and counted but not recorded as a visit
    Unrecorded,
}

impl PageContent {
    /// Outlinks to follow; empty for non-HTML content
    pub fn outlinks(&self) -> &[Url] {
        match self {
            Self::Html { outlinks } => outlinks,
            _ => &[],
        }
    }

    pub fn is_recordable(&self) -> bool {
        !matches!(self, Self::Unrecorded)
    }
}

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub url: Url,
    pub status: FetchStatus,
    /// Content type with parameters stripped, lowercase
    pub content_type: Option<String>,
    pub byte_size: Option<u64>,
    pub outlink_count: Option<usize>,
}

/// Classifies 2xx responses
#[derive(Debug, Clone, Copy)]
pub struct PageClassifier {
    include_binary: bool,
}

impl PageClassifier {
    /// # Arguments
    ///
    /// * `include_binary` - Whether images, PDFs and Word documents are recordable
    pub fn new(include_binary: bool) -> Self {
        Self { include_binary }
    }

    /// Classifies a response, extracting outlinks from HTML bodies
    pub fn classify(
        &self,
        url: &Url,
        response: &FetchResponse,
        extractor: &dyn LinkExtractor,
    ) -> (FetchOutcome, PageContent) {
        let content_type = response
            .content_type
            .as_deref()
            .map(normalize_content_type)
            .filter(|ct| !ct.is_empty());

        let content = match content_type.as_deref() {
            Some("text/html") => {
                let html = String::from_utf8_lossy(&response.body);
                PageContent::Html {
                    outlinks: extractor.extract_links(&html, url),
                }
            }
            Some(ct) if self.include_binary && is_binary_document(ct) => PageContent::Binary,
            _ => PageContent::Unrecorded,
        };

        let outcome = FetchOutcome {
            url: url.clone(),
            status: FetchStatus::Http(response.status),
            content_type,
            byte_size: Some(response.body.len() as u64),
            outlink_count: Some(content.outlinks().len()),
        };

        (outcome, content)
    }
}

/// Strips parameters (such as `; charset=utf-8`) and lowercases
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

fn is_binary_document(ct: &str) -> bool {
    ct.starts_with("image/")
        || ct == "application/pdf"
        || ct == "application/msword"
        || ct == WORD_DOCX
}
