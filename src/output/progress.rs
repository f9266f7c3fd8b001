//! Progress reporting
//!
//! Purely observational counters of submitted and finished keywords, with a
//! periodic log line while the crawl runs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Keyword progress counters
#[derive(Debug)]
pub struct Progress {
    total: AtomicU64,
    finished: AtomicU64,
    started: Instant,
}

/// A point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub finished: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Share of submitted keywords already finished, in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.finished as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} keywords finished ({:.1}%), {:.1}s elapsed",
            self.finished,
            self.total,
            self.percent(),
            self.elapsed.as_secs_f64()
        )
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            finished: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn add_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_finished(&self) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }

    /// Logs progress every `interval` until `cancel` fires
    pub fn show(self: &Arc<Self>, cancel: CancellationToken, interval: Duration) -> JoinHandle<()> {
        let progress = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::info!("Progress: {}", progress.snapshot());
                    }
                }
            }

            tracing::info!("Final progress: {}", progress.snapshot());
        })
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
