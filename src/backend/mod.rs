//! Search backend definitions
//!
//! A backend is one search provider, described by a query URL template, a
//! result-link pattern and a next-page pattern. Everything else in the crawl
//! is backend-agnostic.

use crate::config::{validate_base_url, SearchConfig, KEYWORD_PLACEHOLDER};
use crate::ConfigError;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::fmt;
use url::form_urlencoded;
use url::Url;

/// Anchor pattern matching absolute result links; shared by every backend
const RESULT_LINK_PATTERN: &str = r#"<a[^>]+href="(http[^>"]+)"[^>]+>"#;

const GOOGLE_NEXT_PAGE: &str = r#"<a href="(/search\?q=[^>]+)" id="pnnext"[^>]+>"#;
const BING_NEXT_PAGE: &str = r#"<a[^>]+href="(/search\?q=[^>]+)"[^>]+>"#;
const BAIDU_NEXT_PAGE: &str = r#"<a class="n" href="(/s\?wd=[^>]+)">下一页 &gt;</a>"#;

const DESKTOP_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:92.0) Gecko/20100101 Firefox/92.0";
const MOBILE_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1";

/// Query parameters that carry the keyword, in lookup order
pub const KEYWORD_PARAMS: [&str; 2] = ["wd", "q"];

/// Body fragments marking a page the backend served instead of results
/// (client-side script redirect, rate-limit/error page)
pub const SOFT_FAILURE_MARKERS: [&str; 2] = ["window.location.href", "网络不给力，请稍后重试"];

/// Supported search providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// Google web search
    Google,
    /// A Google mirror; has no public default address
    GoogleImage,
    /// Bing, mobile layout
    Bing,
    /// Baidu, the localized portal
    Baidu,
}

impl Engine {
    /// Default query URL template, if the engine has a well-known address
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Google => Some("https://www.google.com/search?q=$keyword"),
            Self::GoogleImage => None,
            Self::Bing => Some("https://cn.bing.com/search?q=$keyword"),
            Self::Baidu => Some("https://www.baidu.com/s?wd=$keyword"),
        }
    }

    fn next_page_pattern(&self) -> &'static str {
        match self {
            Self::Google | Self::GoogleImage => GOOGLE_NEXT_PAGE,
            Self::Bing => BING_NEXT_PAGE,
            Self::Baidu => BAIDU_NEXT_PAGE,
        }
    }

    fn default_user_agent(&self) -> &'static str {
        match self {
            Self::Bing => MOBILE_AGENT,
            Self::Google | Self::GoogleImage | Self::Baidu => DESKTOP_AGENT,
        }
    }

    /// Parses an engine name as used in config files and on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "google" => Some(Self::Google),
            "google-image" => Some(Self::GoogleImage),
            "bing" => Some(Self::Bing),
            "baidu" => Some(Self::Baidu),
            _ => None,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Google => "google",
            Self::GoogleImage => "google-image",
            Self::Bing => "bing",
            Self::Baidu => "baidu",
        };
        f.write_str(name)
    }
}

/// A fully resolved backend: template, patterns and request identity
#[derive(Debug, Clone)]
pub struct Backend {
    engine: Engine,
    base_url: String,
    user_agent: String,
    result_link: Regex,
    next_page: Regex,
}

impl Backend {
    /// Builds a backend for `engine` using the given query URL template
    ///
    /// # Errors
    ///
    /// Fails if the template lacks the `$keyword` placeholder or is not an
    /// http(s) URL.
    pub fn new(engine: Engine, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        Ok(Self {
            engine,
            base_url,
            user_agent: engine.default_user_agent().to_string(),
            result_link: Regex::new(RESULT_LINK_PATTERN)?,
            next_page: Regex::new(engine.next_page_pattern())?,
        })
    }

    /// Builds the backend described by the `[search]` section
    pub fn from_config(config: &SearchConfig) -> Result<Self, ConfigError> {
        let template = config.resolved_base_url().ok_or_else(|| {
            ConfigError::Validation(format!("engine '{}' needs a base-url", config.engine))
        })?;

        let backend = Self::new(config.engine, template)?;
        Ok(match &config.user_agent {
            Some(agent) => backend.with_user_agent(agent.clone()),
            None => backend,
        })
    }

    /// Replaces the engine's default User-Agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Builds the seed query URL for a keyword
    ///
    /// The keyword is form-encoded so that decoding the query string of the
    /// resulting URL yields the keyword unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use url_harvester::backend::{Backend, Engine};
    ///
    /// let backend = Backend::new(Engine::Baidu, "https://www.baidu.com/s?wd=$keyword").unwrap();
    /// assert_eq!(backend.dork("inurl:php id"), "https://www.baidu.com/s?wd=inurl%3Aphp+id");
    /// ```
    pub fn dork(&self, keyword: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        self.base_url.replace(KEYWORD_PLACEHOLDER, &encoded)
    }

    /// Returns true if the body is a soft failure page that must be retried
    pub fn is_soft_failure(&self, body: &str) -> bool {
        SOFT_FAILURE_MARKERS
            .iter()
            .any(|marker| body.contains(marker))
    }

    /// Raw result links found in a page, in document order
    pub fn result_links<'a>(&self, body: &'a str) -> Vec<&'a str> {
        capture_all(&self.result_link, body)
    }

    /// Raw (usually relative) next-page links found in a page
    pub fn next_page_links<'a>(&self, body: &'a str) -> Vec<&'a str> {
        capture_all(&self.next_page, body)
    }

    /// Headers sent with every search request
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }
}

/// Recovers the keyword from a query URL's `wd` or `q` parameter
pub fn keyword_of(target: &str) -> Option<String> {
    let url = Url::parse(target).ok()?;
    KEYWORD_PARAMS.iter().find_map(|param| {
        url.query_pairs()
            .find(|(key, value)| key == param && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

fn capture_all<'a>(pattern: &Regex, body: &'a str) -> Vec<&'a str> {
    pattern
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
