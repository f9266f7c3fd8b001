/// Checks if a host matches a wildcard pattern
///
/// `example.com` matches only itself; `*.example.com` matches the bare
/// domain and any subdomain depth below it.
///
/// # Examples
///
/// ```
/// use url_harvester::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// A lowercase domain pattern from the blacklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern(String);

impl DomainPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host comparison is case-insensitive
    pub fn matches(&self, host: &str) -> bool {
        matches_wildcard(&self.0, &host.to_lowercase())
    }
}
