//! Result sink
//!
//! A single long-lived task owning the output stream. It drains extracted
//! results until every producer has dropped its sender, writing accepted
//! ones as `keyword<TAB>url` lines.

use crate::output::filter::UrlFilter;
use crate::output::format::{format_result, OutputFormat};
use crate::state::RunState;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// A result link found on a search page, tagged with the keyword it answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResult {
    pub keyword: String,
    pub url: String,
}

/// What the sink did over the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Lines written to the output
    pub written: u64,

    /// Results rejected by formatting, dedup, blacklist or a write error
    pub dropped: u64,

    /// Workers still alive when the result queue closed; zero on a clean shutdown
    pub workers_alive_at_close: usize,
}

/// Consumes the result queue and writes accepted results
pub struct ResultSink {
    results: mpsc::Receiver<ExtractedResult>,
    filter: Arc<dyn UrlFilter>,
    format: OutputFormat,
    delay: Duration,
    state: Arc<RunState>,
}

impl ResultSink {
    pub fn new(
        results: mpsc::Receiver<ExtractedResult>,
        filter: Arc<dyn UrlFilter>,
        format: OutputFormat,
        delay: Duration,
        state: Arc<RunState>,
    ) -> Self {
        Self {
            results,
            filter,
            format,
            delay,
            state,
        }
    }

    /// Drains the queue into `writer` until it is closed
    ///
    /// Every record is flushed as soon as it is written, so output produced
    /// before an abnormal exit is kept.
    pub async fn drain<W>(mut self, writer: &mut W) -> SinkReport
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut report = SinkReport::default();

        while let Some(result) = self.results.recv().await {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.accept(&result) {
                Some(line) => match write_line(writer, &line).await {
                    Ok(()) => report.written += 1,
                    Err(e) => {
                        tracing::warn!("Failed to write result for '{}': {}", result.keyword, e);
                        report.dropped += 1;
                    }
                },
                None => report.dropped += 1,
            }
        }

        report.workers_alive_at_close = self.state.active_workers();
        if report.workers_alive_at_close > 0 {
            tracing::error!(
                "Result queue closed with {} workers still running",
                report.workers_alive_at_close
            );
        }

        tracing::debug!(
            "Result sink closed: {} written, {} dropped",
            report.written,
            report.dropped
        );
        report
    }

    /// Formats and filters one result; `None` means drop it
    fn accept(&self, result: &ExtractedResult) -> Option<String> {
        let formatted = match format_result(&result.url, self.format) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::debug!("Dropping unformattable result {}: {}", result.url, e);
                return None;
            }
        };

        match self.filter.is_duplicate(&formatted) {
            Ok(false) => {}
            Ok(true) => {
                tracing::trace!("Duplicate result {}", formatted);
                return None;
            }
            Err(e) => {
                tracing::debug!("Dedup check failed for {}: {}", formatted, e);
                return None;
            }
        }

        if self.filter.is_in_blacklist(&formatted) {
            tracing::trace!("Blacklisted result {}", formatted);
            return None;
        }

        Some(format!("{}\t{}\n", result.keyword, formatted))
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarvestError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Dedup by exact string, blacklist by substring, counting dedup calls
    #[derive(Default)]
    struct RecordingFilter {
        seen: Mutex<HashSet<String>>,
        blacklisted: Vec<&'static str>,
        dedup_calls: AtomicUsize,
        fail_dedup: bool,
    }

    #[async_trait]
    impl UrlFilter for RecordingFilter {
        fn is_duplicate(&self, result: &str) -> Result<bool, HarvestError> {
            self.dedup_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_dedup {
                return Err(HarvestError::Filter("backend down".to_string()));
            }
            Ok(!self.seen.lock().unwrap().insert(result.to_string()))
        }

        fn is_in_blacklist(&self, result: &str) -> bool {
            self.blacklisted.iter().any(|b| result.contains(b))
        }

        async fn check_redirect(&self, link: &str) -> Result<String, HarvestError> {
            Ok(link.to_string())
        }
    }

    fn result(keyword: &str, url: &str) -> ExtractedResult {
        ExtractedResult {
            keyword: keyword.to_string(),
            url: url.to_string(),
        }
    }

    async fn run_sink(
        filter: Arc<RecordingFilter>,
        format: OutputFormat,
        items: Vec<ExtractedResult>,
    ) -> (SinkReport, String) {
        let (tx, rx) = mpsc::channel(16);
        let sink = ResultSink::new(
            rx,
            filter,
            format,
            Duration::ZERO,
            Arc::new(RunState::new()),
        );

        for item in items {
            tx.send(item).await.unwrap();
        }
        drop(tx);

        let mut out = Vec::new();
        let report = sink.drain(&mut out).await;
        (report, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_identical_results_written_once() {
        let filter = Arc::new(RecordingFilter::default());
        let (report, out) = run_sink(
            filter.clone(),
            OutputFormat::Raw,
            vec![
                result("kw", "http://example.com/a"),
                result("kw", "http://example.com/a"),
            ],
        )
        .await;

        assert_eq!(out, "kw\thttp://example.com/a\n");
        assert_eq!(report.written, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(filter.dedup_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_output_uses_formatted_url() {
        let filter = Arc::new(RecordingFilter::default());
        let (_, out) = run_sink(
            filter,
            OutputFormat::Domain,
            vec![
                result("kw", "http://example.com/a?x=1&amp;y=2"),
                // Same host after formatting
                result("other", "http://example.com/b"),
            ],
        )
        .await;

        assert_eq!(out, "kw\texample.com\n");
    }

    #[tokio::test]
    async fn test_blacklisted_and_malformed_results_dropped() {
        let filter = Arc::new(RecordingFilter {
            blacklisted: vec!["google.com"],
            ..Default::default()
        });
        let (report, out) = run_sink(
            filter,
            OutputFormat::Url,
            vec![
                result("kw", "https://www.google.com/url?q=1"),
                result("kw", "::not a url::"),
                result("kw", "https://kept.example.org/x"),
            ],
        )
        .await;

        assert_eq!(out, "kw\thttps://kept.example.org/x\n");
        assert_eq!(report.written, 1);
        assert_eq!(report.dropped, 2);
    }

    #[tokio::test]
    async fn test_dedup_error_drops_only_that_item() {
        let filter = Arc::new(RecordingFilter {
            fail_dedup: true,
            ..Default::default()
        });
        let (report, out) = run_sink(
            filter,
            OutputFormat::Raw,
            vec![result("kw", "http://a.example.com/"), result("kw", "http://b.example.com/")],
        )
        .await;

        assert!(out.is_empty());
        assert_eq!(report.dropped, 2);
    }

    #[tokio::test]
    async fn test_reports_live_workers_at_close() {
        let state = Arc::new(RunState::new());
        let (tx, rx) = mpsc::channel::<ExtractedResult>(1);
        let sink = ResultSink::new(
            rx,
            Arc::new(RecordingFilter::default()),
            OutputFormat::Raw,
            Duration::ZERO,
            state.clone(),
        );

        let straggler = state.worker_started();
        drop(tx);
        let mut out = Vec::new();
        let report = sink.drain(&mut out).await;
        assert_eq!(report.workers_alive_at_close, 1);
        drop(straggler);
    }
}
