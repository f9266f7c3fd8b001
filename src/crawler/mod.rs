//! Crawler module: the crawl scheduler and its fetch-and-parse workers
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching without redirect following
//! - Result and pagination link extraction
//! - The bounded work queue shared by all workers
//! - Keyword submission and shutdown coordination

mod fetcher;
mod parser;
mod queue;
mod scheduler;
mod worker;

#[cfg(test)]
mod testing;

pub use fetcher::{build_http_client, FetchedPage, Fetcher, HttpFetcher};
pub use parser::{parse_page, resolve_location, resolve_next_page, ParsedPage};
pub use queue::{FetchTarget, WorkQueue};
pub use scheduler::{CrawlScheduler, CrawlSettings, CrawlSummary};
pub use worker::{TargetOutcome, Worker, WorkerContext};
