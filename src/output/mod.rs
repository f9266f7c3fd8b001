//! Output module: the result sink and its collaborators
//!
//! This module handles:
//! - Formatting result URLs per the configured output mode
//! - Dedup, blacklist and jump-link filtering
//! - Draining extracted results into the output stream
//! - Progress reporting

mod filter;
mod format;
mod progress;
mod sink;

pub use filter::{DefaultUrlFilter, UrlFilter};
pub use format::{format_result, OutputFormat};
pub use progress::{Progress, ProgressSnapshot};
pub use sink::{ExtractedResult, ResultSink, SinkReport};
