//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CountdownLatch`: outstanding unit-of-work counter with an async wait
//! - `CompletionTracker`: per-keyword exactly-once completion on top of the latch
//! - `RunState`: the shared cancellation signal and live worker count

mod completion;
mod run_state;

pub use completion::{CompletionTracker, CountdownLatch};
pub use run_state::{RunState, WorkerGuard};
