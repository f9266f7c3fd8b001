//! Configuration module for url-harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use url_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Workers: {}", config.search.routine_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DomainEntry, FilterConfig, OutputConfig, QueueConfig, SearchConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_base_url, KEYWORD_PLACEHOLDER};
