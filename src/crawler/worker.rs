//! Fetch-and-parse workers
//!
//! Each worker loops pulling one target from the shared queue, fetching it
//! once, emitting the result links it finds and feeding pagination and
//! redirect targets back into the queue. A page without a next-page link is
//! the end of its keyword's search.

use crate::backend::Backend;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{parse_page, resolve_location};
use crate::crawler::queue::{FetchTarget, WorkQueue};
use crate::output::{ExtractedResult, Progress, UrlFilter};
use crate::state::{CompletionTracker, RunState, WorkerGuard};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Everything a worker shares with the rest of the run
#[derive(Clone)]
pub struct WorkerContext {
    pub backend: Arc<Backend>,
    pub fetcher: Arc<dyn Fetcher>,
    pub filter: Arc<dyn UrlFilter>,
    pub queue: WorkQueue,
    pub results: mpsc::Sender<ExtractedResult>,
    pub tracker: Arc<CompletionTracker>,
    pub progress: Arc<Progress>,
    pub state: Arc<RunState>,
}

/// What happened to one fetch target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The fetch failed; the target was dropped and its keyword's search ended
    Failed,
    /// The `Location` of a redirect was queued
    Redirected,
    /// Soft failure page; the same target was queued again
    Retried,
    /// Results emitted and this many next-page targets queued
    Paginated(usize),
    /// Results emitted and no next page: the keyword's search is over
    Exhausted,
}

pub struct Worker {
    id: usize,
    ctx: WorkerContext,
    headers: HeaderMap,
}

impl Worker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        let headers = ctx.backend.request_headers();
        Self { id, ctx, headers }
    }

    /// Processes targets until cancellation is observed at the queue
    ///
    /// A target already pulled is always processed to the end, so shutdown
    /// waits for at most one fetch per worker.
    pub async fn run(self, _guard: WorkerGuard) {
        tracing::debug!("Worker {} started", self.id);

        let mut processed = 0u64;
        while let Some(target) = self.ctx.queue.pull(self.ctx.state.token()).await {
            let outcome = self.process(&target).await;
            tracing::trace!("Worker {}: {} -> {:?}", self.id, target, outcome);
            processed += 1;
        }

        tracing::debug!("Worker {} stopped after {} targets", self.id, processed);
    }

    /// Fetches and handles a single target
    pub async fn process(&self, target: &FetchTarget) -> TargetOutcome {
        let page = match self.ctx.fetcher.get(&target.url, &self.headers).await {
            Ok(page) => page,
            Err(e) => {
                // Not retried; the keyword is finished with whatever it produced so far
                tracing::warn!("Fetch failed for {}: {}", target, e);
                self.finish(&target.keyword);
                return TargetOutcome::Failed;
            }
        };

        if page.is_redirect() {
            let Some(location) = page.location else {
                tracing::warn!("Redirect ({}) from {} has no Location", page.status, target);
                self.finish(&target.keyword);
                return TargetOutcome::Failed;
            };

            return match resolve_location(&target.url, &location) {
                Some(next) => {
                    tracing::debug!("{} redirected ({}) to {}", target, page.status, next);
                    self.push(target.derive(next)).await;
                    TargetOutcome::Redirected
                }
                None => {
                    tracing::warn!("Unusable redirect from {} to '{}'", target, location);
                    self.finish(&target.keyword);
                    TargetOutcome::Failed
                }
            };
        }

        if self.ctx.backend.is_soft_failure(&page.body) {
            tracing::debug!("Soft failure page for {}, queueing it again", target);
            self.push(target.clone()).await;
            return TargetOutcome::Retried;
        }

        let page_url = match Url::parse(&target.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot parse fetched target {}: {}", target, e);
                self.finish(&target.keyword);
                return TargetOutcome::Failed;
            }
        };

        let parsed = parse_page(&self.ctx.backend, &page_url, &page.body);
        self.emit_results(&target.keyword, &parsed.result_links).await;

        if parsed.next_pages.is_empty() {
            self.finish(&target.keyword);
            return TargetOutcome::Exhausted;
        }

        let count = parsed.next_pages.len();
        for next in parsed.next_pages {
            self.push(target.derive(next)).await;
        }
        TargetOutcome::Paginated(count)
    }

    async fn emit_results(&self, keyword: &str, links: &[String]) {
        for link in links {
            let url = match self.ctx.filter.check_redirect(link).await {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Skipping result link {}: {}", link, e);
                    continue;
                }
            };

            let result = ExtractedResult {
                keyword: keyword.to_string(),
                url,
            };
            if self.ctx.results.send(result).await.is_err() {
                tracing::warn!("Result queue closed; discarding results for '{}'", keyword);
                return;
            }
        }
    }

    async fn push(&self, target: FetchTarget) {
        if let Err(e) = self.ctx.queue.push(target, self.ctx.state.token()).await {
            tracing::debug!("Worker {} dropped a target: {}", self.id, e);
        }
    }

    /// Releases a keyword, at most once per keyword per run
    fn finish(&self, keyword: &str) {
        if self.ctx.tracker.finish(keyword) {
            self.ctx.progress.add_finished();
            tracing::debug!("Search for '{}' finished", keyword);
        }
    }
}
