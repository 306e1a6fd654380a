/// Checks if a host falls under an allow-listed domain
///
/// A domain matches itself and every subdomain, on label boundaries:
/// "nytimes.com" matches "nytimes.com" and "www.nytimes.com" but not
/// "notnytimes.com". A leading "*." on the pattern is accepted and means the same.
///
/// Both arguments are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use tidemark::url::matches_domain;
///
/// assert!(matches_domain("nytimes.com", "www.nytimes.com"));
/// assert!(matches_domain("*.nytimes.com", "nytimes.com"));
/// assert!(!matches_domain("nytimes.com", "notnytimes.com"));
/// ```
pub fn matches_domain(pattern: &str, candidate: &str) -> bool {
    let base = pattern.strip_prefix("*.").unwrap_or(pattern);
    if base.is_empty() || candidate.is_empty() {
        return false;
    }

    match candidate.strip_suffix(base) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.'),
        None => false,
    }
}
