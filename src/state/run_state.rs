use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// State shared by the scheduler, the workers and the sink for one run
///
/// Holds the single cancellation signal (fired once, after the last keyword
/// finishes) and the number of workers that have not yet exited.
#[derive(Debug, Default)]
pub struct RunState {
    cancel: CancellationToken,
    active_workers: AtomicUsize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    /// Counts a worker as live until the returned guard is dropped
    pub fn worker_started(self: &Arc<Self>) -> WorkerGuard {
        self.active_workers.fetch_add(1, Ordering::AcqRel);
        WorkerGuard {
            state: Arc::clone(self),
        }
    }
}

/// Live-worker registration; decrements the count on drop, including on panic
#[derive(Debug)]
pub struct WorkerGuard {
    state: Arc<RunState>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.state.active_workers.fetch_sub(1, Ordering::AcqRel);
    }
}
