//! Search page parsing
//!
//! Extracts result links and next-page links from a fetched page using the
//! backend's patterns. Next-page links are resolved against the page's own
//! URL so they can go straight back onto the work queue.

use crate::backend::Backend;
use url::Url;

/// Links extracted from one search page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Raw result links, in document order
    pub result_links: Vec<String>,

    /// Absolute next-page URLs
    pub next_pages: Vec<String>,
}

/// Parses a search page fetched from `page_url`
///
/// # Example
///
/// ```
/// use url::Url;
/// use url_harvester::backend::{Backend, Engine};
/// use url_harvester::crawler::parse_page;
///
/// let backend = Backend::new(Engine::Google, "https://www.google.com/search?q=$keyword").unwrap();
/// let page_url = Url::parse("https://www.google.com/search?q=rust").unwrap();
/// let body = r#"<a href="https://www.rust-lang.org/" class="r">Rust</a>
///               <a href="/search?q=rust&amp;start=10" id="pnnext" class="n">Next</a>"#;
///
/// let parsed = parse_page(&backend, &page_url, body);
/// assert_eq!(parsed.result_links, vec!["https://www.rust-lang.org/"]);
/// assert_eq!(parsed.next_pages, vec!["https://www.google.com/search?q=rust&start=10"]);
/// ```
pub fn parse_page(backend: &Backend, page_url: &Url, body: &str) -> ParsedPage {
    let result_links = backend
        .result_links(body)
        .into_iter()
        .map(str::to_string)
        .collect();

    let next_pages = backend
        .next_page_links(body)
        .into_iter()
        .filter_map(|href| {
            let resolved = resolve_next_page(page_url, href);
            if resolved.is_none() {
                tracing::debug!("Skipping unresolvable next-page link {}", href);
            }
            resolved
        })
        .collect();

    ParsedPage {
        result_links,
        next_pages,
    }
}

/// Resolves a next-page href against the page it was found on
///
/// HTML-escaped ampersands are decoded first; the result keeps the page's
/// scheme, host and port.
pub fn resolve_next_page(page_url: &Url, href: &str) -> Option<String> {
    let href = href.replace("&amp;", "&");
    let resolved = page_url.join(href.trim()).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved.to_string())
}

/// Resolves a redirect `Location` header against the URL that returned it
///
/// Relative locations are legal and common; the header value is used as is,
/// without HTML unescaping.
pub fn resolve_location(target_url: &str, location: &str) -> Option<String> {
    let resolved = Url::parse(target_url).ok()?.join(location.trim()).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved.to_string())
}
