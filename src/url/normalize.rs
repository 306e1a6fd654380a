use crate::UrlError;
use url::Url;

/// Parses an absolute crawlable URL
///
/// Only `http` and `https` URLs with a host are accepted. The fragment is
/// dropped, so the result is already in dedup-key form. Seeds go through this
/// at startup, so a malformed seed fails the run before any worker starts.
///
/// # Examples
///
/// ```
/// use tidemark::url::parse_crawl_url;
///
/// assert!(parse_crawl_url("https://example.com/").is_ok());
/// assert!(parse_crawl_url("mailto:someone@example.com").is_err());
/// ```
pub fn parse_crawl_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Produces the dedup key for a URL
///
/// Scheme and host are lower-cased (the `url` crate already does this for
/// http/https), the fragment is dropped, and path and query are kept as parsed.
///
/// # Examples
///
/// ```
/// use tidemark::url::canonicalize;
/// use url::Url;
///
/// let url = Url::parse("HTTPS://Example.COM/News?id=7#top").unwrap();
/// assert_eq!(canonicalize(&url), "https://example.com/News?id=7");
/// ```
pub fn canonicalize(url: &Url) -> String {
    if url.fragment().is_none() {
        return url.as_str().to_string();
    }
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}
