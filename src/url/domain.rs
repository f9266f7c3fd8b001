use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use url_harvester::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts `host[:port]` from a URL, keeping an explicit non-default port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use url_harvester::url::extract_authority;
///
/// let url = Url::parse("http://example.com/a").unwrap();
/// assert_eq!(extract_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
/// assert_eq!(extract_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Finds the host of a formatted result
///
/// Formatted results are either full URLs or bare `host[:port]` strings
/// (the `domain` output mode), so both shapes are accepted.
pub fn host_of_result(result: &str) -> Option<String> {
    if result.contains("://") {
        return Url::parse(result).ok().as_ref().and_then(extract_domain);
    }

    let host = result.split(['/', '?', '#']).next()?;
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}
