//! URL filter collaborator: dedup, blacklist and jump-link resolution

use crate::config::Config;
use crate::crawler::build_http_client;
use crate::url::{host_of_result, DomainPattern};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Filtering decisions applied to extracted links and formatted results
#[async_trait]
pub trait UrlFilter: Send + Sync {
    /// Records a formatted result; true if it was seen before
    fn is_duplicate(&self, result: &str) -> Result<bool, HarvestError>;

    /// True if the result's host is blacklisted
    fn is_in_blacklist(&self, result: &str) -> bool;

    /// Resolves a raw result link to the URL it stands for
    async fn check_redirect(&self, link: &str) -> Result<String, HarvestError>;
}

/// In-memory filter used for real runs
#[derive(Debug)]
pub struct DefaultUrlFilter {
    seen: Mutex<HashSet<String>>,
    blacklist: Vec<DomainPattern>,
    redirect_prefixes: Vec<String>,
    client: Client,
}

impl DefaultUrlFilter {
    pub fn new(blacklist: &[String], redirect_prefixes: &[String]) -> Result<Self, HarvestError> {
        Ok(Self {
            seen: Mutex::new(HashSet::new()),
            blacklist: blacklist.iter().map(|p| DomainPattern::new(p)).collect(),
            redirect_prefixes: redirect_prefixes.to_vec(),
            client: build_http_client()?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let blacklist: Vec<String> = config.blacklist.iter().map(|e| e.domain.clone()).collect();
        Self::new(&blacklist, &config.filter.redirect_prefixes)
    }

    fn is_jump_link(&self, link: &str) -> bool {
        self.redirect_prefixes
            .iter()
            .any(|prefix| link.starts_with(prefix.as_str()))
    }

    /// One non-following GET; the target is the `Location` header
    async fn resolve_jump_link(&self, link: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(link)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: link.to_string(),
                source,
            })?;

        if !response.status().is_redirection() {
            return Err(HarvestError::MissingLocation {
                url: link.to_string(),
            });
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HarvestError::MissingLocation {
                url: link.to_string(),
            })
    }
}

#[async_trait]
impl UrlFilter for DefaultUrlFilter {
    fn is_duplicate(&self, result: &str) -> Result<bool, HarvestError> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| HarvestError::Filter("dedup set lock poisoned".to_string()))?;
        Ok(!seen.insert(result.to_string()))
    }

    fn is_in_blacklist(&self, result: &str) -> bool {
        match host_of_result(result) {
            Some(host) => self.blacklist.iter().any(|pattern| pattern.matches(&host)),
            None => false,
        }
    }

    async fn check_redirect(&self, link: &str) -> Result<String, HarvestError> {
        if self.is_jump_link(link) {
            return self.resolve_jump_link(&link.replace("&amp;", "&")).await;
        }

        let url = Url::parse(link)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(crate::UrlError::InvalidScheme(url.scheme().to_string()).into());
        }
        Ok(link.to_string())
    }
}
