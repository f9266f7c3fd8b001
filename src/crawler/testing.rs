//! Scripted fetch double shared by the crawler unit tests

use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Scripted {
    Page(FetchedPage),
    Fail,
}

/// Answers each URL from a per-URL script. The last scripted answer repeats;
/// unscripted URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn page(&self, url: &str, body: &str) -> &Self {
        self.push(
            url,
            Scripted::Page(FetchedPage {
                status: 200,
                location: None,
                body: body.to_string(),
            }),
        )
    }

    pub fn redirect(&self, url: &str, status: u16, location: &str) -> &Self {
        self.push(
            url,
            Scripted::Page(FetchedPage {
                status,
                location: Some(location.to_string()),
                body: String::new(),
            }),
        )
    }

    /// Scripts an arbitrary response, such as a redirect without `Location`
    pub fn push_page(&self, url: &str, page: FetchedPage) -> &Self {
        self.push(url, Scripted::Page(page))
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.push(url, Scripted::Fail)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }

    fn push(&self, url: &str, answer: Scripted) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    fn next_answer(&self, url: &str) -> Scripted {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Scripted::Fail),
            Some(queue) => queue.front().cloned().unwrap_or(Scripted::Fail),
            None => Scripted::Fail,
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, url: &str, _headers: &HeaderMap) -> Result<FetchedPage, HarvestError> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_answer(url) {
            Scripted::Page(page) => Ok(page),
            Scripted::Fail => Err(HarvestError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no route to {}", url),
            ))),
        }
    }
}

/// A Google-style results page with the given result links and optional
/// next-page href
pub fn results_page(results: &[&str], next: Option<&str>) -> String {
    let mut body = String::from("<html><body>");
    for link in results {
        body.push_str(&format!("<a href=\"{}\" class=\"r\">result</a>\n", link));
    }
    if let Some(next) = next {
        body.push_str(&format!(
            "<a href=\"{}\" id=\"pnnext\" class=\"n\">Next</a>\n",
            next
        ));
    }
    body.push_str("</body></html>");
    body
}
