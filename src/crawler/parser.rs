//! HTML link extraction
//!
//! Outlinks are collected from every element that references another
//! resource: anchors and image-map areas, `<link>` elements, images, frames
//! and scripts. The extraction result is the set of distinct absolute
//! http(s) URLs, in document order.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Attribute-bearing elements that reference other resources
const LINK_SOURCES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("area[href]", "href"),
    ("link[href]", "href"),
    ("img[src]", "src"),
    ("iframe[src]", "src"),
    ("frame[src]", "src"),
    ("script[src]", "src"),
];

/// Extracts outlinks from a page body
pub trait LinkExtractor: Send + Sync {
    /// Returns the distinct absolute URLs referenced by `html`
    fn extract_links(&self, html: &str, base: &Url) -> Vec<Url>;
}

/// scraper-based extractor used by default
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        let base = document_base(&document, base);

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for (selector, attr) in LINK_SOURCES {
            let Ok(selector) = Selector::parse(selector) else {
                continue;
            };
            for element in document.select(&selector) {
                let Some(value) = element.value().attr(attr) else {
                    continue;
                };
                if let Some(url) = resolve_link(value, &base) {
                    if seen.insert(url.as_str().to_string()) {
                        links.push(url);
                    }
                }
            }
        }

        links
    }
}

/// Honors `<base href>` when present and resolvable
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

/// Resolves an attribute value to an absolute http(s) URL
///
/// Returns None for empty values, fragment-only references, pseudo-schemes
/// (`javascript:`, `mailto:`, `tel:`, `data:`) and anything that does not
/// resolve to http or https.
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
