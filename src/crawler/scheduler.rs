//! Crawl scheduler
//!
//! Seeds the work queue from the keyword stream, runs the worker pool and the
//! result sink, and shuts everything down once every keyword's search has
//! finished.
//!
//! # Shutdown order
//!
//! 1. Wait for the completion tracker to reach zero
//! 2. Fire the cancellation signal
//! 3. Join every worker
//! 4. Drop the last result sender, closing the result queue
//! 5. Wait for the sink to drain
//!
//! Closing the result queue only after the workers are joined means no worker
//! can be writing into it when it closes.

use crate::backend::Backend;
use crate::config::Config;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::queue::{FetchTarget, WorkQueue};
use crate::crawler::worker::{Worker, WorkerContext};
use crate::output::{DefaultUrlFilter, OutputFormat, Progress, ResultSink, UrlFilter};
use crate::state::{CompletionTracker, RunState};
use crate::HarvestError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Tunables for one run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Number of fetch-and-parse workers
    pub routine_count: usize,
    pub work_capacity: usize,
    pub result_capacity: usize,
    pub format: OutputFormat,
    /// Delay the sink applies before each result
    pub sink_delay: Duration,
    pub progress_interval: Duration,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            routine_count: config.search.routine_count,
            work_capacity: config.queue.work_capacity,
            result_capacity: config.queue.result_capacity,
            format: config.search.format,
            sink_delay: Duration::from_millis(config.output.sink_delay_ms),
            progress_interval: Duration::from_millis(config.output.progress_interval_ms),
        }
    }
}

impl CrawlSettings {
    /// Smallest progress interval accepted; matches config validation
    pub const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(10);

    /// Raises values a run cannot work with to their minimum
    ///
    /// Zero workers would never finish a keyword, and zero capacities or a
    /// zero progress interval panic in tokio.
    pub fn clamped(self) -> Self {
        let clamped = Self {
            routine_count: self.routine_count.max(1),
            work_capacity: self.work_capacity.max(1),
            result_capacity: self.result_capacity.max(1),
            progress_interval: self.progress_interval.max(Self::MIN_PROGRESS_INTERVAL),
            ..self.clone()
        };
        if clamped.routine_count != self.routine_count
            || clamped.work_capacity != self.work_capacity
            || clamped.result_capacity != self.result_capacity
            || clamped.progress_interval != self.progress_interval
        {
            tracing::warn!("Adjusted crawl settings to their minimums: {:?}", clamped);
        }
        clamped
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            routine_count: 10,
            work_capacity: 10240,
            result_capacity: 1024,
            format: OutputFormat::Raw,
            sink_delay: Duration::from_millis(100),
            progress_interval: Duration::from_secs(1),
        }
    }
}

/// Totals for a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Distinct keywords submitted
    pub submitted: usize,
    /// Keywords whose search finished
    pub finished: usize,
    /// Keywords still outstanding when the run ended; zero for a normal run
    pub outstanding: usize,
    pub results_written: u64,
    pub results_dropped: u64,
    /// Workers still alive when the result queue closed
    pub workers_alive_at_close: usize,
    pub elapsed: Duration,
}

/// Runs keyword searches against one backend
pub struct CrawlScheduler {
    backend: Arc<Backend>,
    fetcher: Arc<dyn Fetcher>,
    filter: Arc<dyn UrlFilter>,
    settings: CrawlSettings,
}

impl CrawlScheduler {
    pub fn new(
        backend: Backend,
        fetcher: Arc<dyn Fetcher>,
        filter: Arc<dyn UrlFilter>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            fetcher,
            filter,
            settings: settings.clamped(),
        }
    }

    /// Builds a scheduler with the HTTP fetcher and in-memory filter
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let backend = Backend::from_config(&config.search)?;
        let fetcher = Arc::new(HttpFetcher::new()?);
        let filter = Arc::new(DefaultUrlFilter::from_config(config)?);
        Ok(Self::new(
            backend,
            fetcher,
            filter,
            CrawlSettings::from_config(config),
        ))
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Searches every keyword in `keywords` and writes results to `output`
    ///
    /// Returns once every keyword's search has finished and the sink has
    /// drained.
    pub async fn run<R, W>(&self, keywords: R, output: W) -> Result<CrawlSummary, HarvestError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let started = Instant::now();
        let state = Arc::new(RunState::new());
        let tracker = Arc::new(CompletionTracker::new());
        let progress = Arc::new(Progress::new());
        let queue = WorkQueue::new(self.settings.work_capacity);
        let (results_tx, results_rx) = mpsc::channel(self.settings.result_capacity);

        let progress_task = progress.show(state.token().clone(), self.settings.progress_interval);

        let sink = ResultSink::new(
            results_rx,
            Arc::clone(&self.filter),
            self.settings.format,
            self.settings.sink_delay,
            Arc::clone(&state),
        );
        let sink_task = tokio::spawn(async move {
            let mut output = output;
            sink.drain(&mut output).await
        });

        let ctx = WorkerContext {
            backend: Arc::clone(&self.backend),
            fetcher: Arc::clone(&self.fetcher),
            filter: Arc::clone(&self.filter),
            queue: queue.clone(),
            results: results_tx,
            tracker: Arc::clone(&tracker),
            progress: Arc::clone(&progress),
            state: Arc::clone(&state),
        };
        let mut workers = JoinSet::new();
        for id in 0..self.settings.routine_count {
            let guard = state.worker_started();
            workers.spawn(Worker::new(id, ctx.clone()).run(guard));
        }
        tracing::info!(
            "Started {} workers against {}",
            self.settings.routine_count,
            self.backend.engine()
        );

        self.submit_keywords(keywords, &queue, &tracker, &progress, &state)
            .await;
        tracing::info!(
            "All {} keywords queued, waiting for searches to finish",
            tracker.submitted()
        );

        tracker.wait().await;

        state.cancel();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }
        // The context holds the last result sender; dropping it closes the queue
        drop(ctx);
        let report = sink_task.await?;

        if let Err(e) = progress_task.await {
            tracing::warn!("Progress display failed: {}", e);
        }

        Ok(CrawlSummary {
            submitted: tracker.submitted(),
            finished: tracker.finished(),
            outstanding: tracker.outstanding(),
            results_written: report.written,
            results_dropped: report.dropped,
            workers_alive_at_close: report.workers_alive_at_close,
            elapsed: started.elapsed(),
        })
    }

    /// Reads keywords line by line and queues one seed dork per new keyword
    ///
    /// A keyword is registered before its dork is queued, so no worker can
    /// finish it before it counts as outstanding. Repeated keywords are
    /// skipped.
    async fn submit_keywords<R>(
        &self,
        keywords: R,
        queue: &WorkQueue,
        tracker: &CompletionTracker,
        progress: &Progress,
        state: &RunState,
    ) where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = keywords.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Stopped reading keywords: {}", e);
                    break;
                }
            };

            let keyword = line.trim();
            if keyword.is_empty() {
                continue;
            }
            if !tracker.register(keyword) {
                tracing::debug!("Skipping repeated keyword '{}'", keyword);
                continue;
            }
            progress.add_total();

            let seed = FetchTarget::new(keyword, self.backend.dork(keyword));
            tracing::debug!("Queueing {}", seed);
            if let Err(e) = queue.push(seed, state.token()).await {
                tracing::warn!("Could not queue keyword '{}': {}", keyword, e);
                tracker.finish(keyword);
            }
        }
    }
}
