use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidemark::url::extract_host;
///
/// let url = Url::parse("https://WWW.Example.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the key used for per-host politeness and robots state
///
/// This is the authority: the lowercase host plus an explicit non-default port.
/// Two servers on the same machine but different ports are different hosts.
pub fn host_key(url: &Url) -> Option<String> {
    let host = extract_host(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Builds the robots.txt location for the host serving `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let mut robots = url.clone();
    robots.host_str()?;
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    Some(robots)
}
