//! Bounded work queue of pending fetch targets
//!
//! Many producers (the scheduler seeding keywords, workers feeding back
//! pagination and redirect targets) and many consumers (the workers). A full
//! queue blocks the producer, which caps memory and pushes back against
//! runaway pagination.

use crate::HarvestError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// A URL waiting to be fetched: a seed dork, a next-page link, a redirect
/// target or a retry
///
/// Every target carries the keyword whose search it belongs to. Targets found
/// while processing another target inherit that target's keyword, so a
/// backend rewriting the query in its own links cannot detach a page from
/// its search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTarget {
    pub keyword: String,
    pub url: String,
}

impl FetchTarget {
    pub fn new(keyword: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            url: url.into(),
        }
    }

    /// A target for `url` belonging to the same search as `self`
    pub fn derive(&self, url: impl Into<String>) -> Self {
        Self::new(self.keyword.clone(), url)
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.url, self.keyword)
    }
}

/// Shared multi-producer, multi-consumer queue of fetch targets
#[derive(Debug, Clone)]
pub struct WorkQueue {
    sender: mpsc::Sender<FetchTarget>,
    receiver: Arc<Mutex<mpsc::Receiver<FetchTarget>>>,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Number of targets currently queued
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues a target, waiting for room if the queue is full
    ///
    /// A push still waiting when `cancel` fires is abandoned with
    /// `HarvestError::Cancelled`: once shutdown begins no worker is left to
    /// make room.
    pub async fn push(
        &self,
        target: FetchTarget,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        tokio::select! {
            biased;
            sent = self.sender.send(target) => sent.map_err(|_| HarvestError::QueueClosed),
            _ = cancel.cancelled() => Err(HarvestError::Cancelled),
        }
    }

    /// Takes the next target, or `None` once `cancel` has fired
    ///
    /// Cancellation wins whenever both are ready. Receiving is cancel-safe, so
    /// a target is never lost by losing the race.
    pub async fn pull(&self, cancel: &CancellationToken) -> Option<FetchTarget> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            target = async { self.receiver.lock().await.recv().await } => target,
        }
    }
}
