//! Keyword completion tracking
//!
//! The shared work queue can be transiently empty while pages are in flight,
//! so its emptiness says nothing about whether the crawl is done. Instead each
//! keyword is one unit of outstanding work, released exactly once when some
//! page of its search yields no next-page link.

use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::watch;

/// A countdown latch: `add` raises the count, `done` lowers it and `wait`
/// resolves once it reaches zero.
#[derive(Debug)]
pub struct CountdownLatch {
    count: watch::Sender<usize>,
}

impl CountdownLatch {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    pub fn add(&self, n: usize) {
        self.count.send_modify(|count| *count += n);
    }

    /// Decrements by one. Returns false, leaving the count at zero, if the
    /// latch was already released.
    pub fn done(&self) -> bool {
        self.count.send_if_modified(|count| match count.checked_sub(1) {
            Some(next) => {
                *count = next;
                true
            }
            None => false,
        })
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until the count is zero; returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for CountdownLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct KeywordSets {
    registered: HashSet<String>,
    finished: HashSet<String>,
}

/// Tracks which keywords are still being searched
///
/// Both operations are atomic insert-if-absent checks, so any number of
/// workers may race to finish the same keyword and only one of them
/// releases its unit of work.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    latch: CountdownLatch,
    keywords: Mutex<KeywordSets>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a keyword as outstanding work
    ///
    /// Returns false, without touching the latch, if the keyword was already
    /// registered during this run.
    pub fn register(&self, keyword: &str) -> bool {
        let mut keywords = self.lock();
        if !keywords.registered.insert(keyword.to_string()) {
            return false;
        }
        self.latch.add(1);
        true
    }

    /// Marks a keyword finished
    ///
    /// Returns true only for the first call on a registered keyword; that call
    /// is the one that counts the latch down.
    pub fn finish(&self, keyword: &str) -> bool {
        let mut keywords = self.lock();
        if !keywords.registered.contains(keyword) {
            return false;
        }
        if !keywords.finished.insert(keyword.to_string()) {
            return false;
        }
        self.latch.done()
    }

    pub fn is_finished(&self, keyword: &str) -> bool {
        self.lock().finished.contains(keyword)
    }

    /// Number of registered keywords not yet finished
    pub fn outstanding(&self) -> usize {
        self.latch.count()
    }

    pub fn submitted(&self) -> usize {
        self.lock().registered.len()
    }

    pub fn finished(&self) -> usize {
        self.lock().finished.len()
    }

    /// Waits until every registered keyword has finished
    pub async fn wait(&self) {
        self.latch.wait().await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, KeywordSets> {
        // The sets stay consistent even if a holder panicked: every update is
        // a single insert.
        self.keywords
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
