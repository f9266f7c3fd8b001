//! HTTP fetch collaborator
//!
//! Workers only need three things from a fetch: the status code, the
//! `Location` header of a redirect and the body text. Redirects are never
//! followed here; the worker turns them into new queue entries instead.

use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// One fetched search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// `Location` header value, if present
    pub location: Option<String>,

    /// Body text; left empty for redirects
    pub body: String,
}

impl FetchedPage {
    /// True for statuses in `[301, 400)`
    pub fn is_redirect(&self) -> bool {
        (301..400).contains(&self.status)
    }
}

/// Performs a single GET for a fetch target
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` with the given request headers
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Http` on transport failure and
    /// `HarvestError::Body` if the body cannot be read.
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<FetchedPage, HarvestError>;
}

/// Builds an HTTP client that does not follow redirects
///
/// # Example
///
/// ```no_run
/// use url_harvester::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<FetchedPage, HarvestError> {
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut page = FetchedPage {
            status,
            location,
            body: String::new(),
        };
        if page.is_redirect() {
            return Ok(page);
        }

        page.body = response.text().await.map_err(|source| HarvestError::Body {
            url: url.to_string(),
            source,
        })?;
        Ok(page)
    }
}
