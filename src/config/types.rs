use crate::backend::Engine;
use crate::output::OutputFormat;
use serde::Deserialize;

/// Main configuration structure for url-harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub blacklist: Vec<DomainEntry>,
}

/// Search backend and worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Which search backend to crawl
    pub engine: Engine,

    /// Query URL template containing a `$keyword` placeholder.
    /// Falls back to the engine's default template when absent.
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Number of fetch-and-parse workers
    #[serde(rename = "routine-count", default = "default_routine_count")]
    pub routine_count: usize,

    /// How accepted result URLs are written
    #[serde(default)]
    pub format: OutputFormat,

    /// Overrides the engine's default User-Agent
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// Queue sizing
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Capacity of the pending fetch target queue
    #[serde(rename = "work-capacity", default = "default_work_capacity")]
    pub work_capacity: usize,

    /// Capacity of the extracted result queue
    #[serde(rename = "result-capacity", default = "default_result_capacity")]
    pub result_capacity: usize,
}

/// Result sink and progress display configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Fixed delay applied by the sink before handling each result (milliseconds)
    #[serde(rename = "sink-delay-ms", default = "default_sink_delay_ms")]
    pub sink_delay_ms: u64,

    /// Interval between progress lines (milliseconds)
    #[serde(rename = "progress-interval-ms", default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

/// URL filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Result links starting with one of these prefixes are search-engine
    /// jump links and get resolved through their `Location` header
    #[serde(rename = "redirect-prefixes", default = "default_redirect_prefixes")]
    pub redirect_prefixes: Vec<String>,
}

/// Simple domain entry for the blacklist
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,
}

impl SearchConfig {
    /// The configured template, or the engine's default when none is set
    pub fn resolved_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .or_else(|| self.engine.default_base_url())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            work_capacity: default_work_capacity(),
            result_capacity: default_result_capacity(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink_delay_ms: default_sink_delay_ms(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            redirect_prefixes: default_redirect_prefixes(),
        }
    }
}

fn default_routine_count() -> usize {
    10
}

fn default_work_capacity() -> usize {
    10240
}

fn default_result_capacity() -> usize {
    1024
}

fn default_sink_delay_ms() -> u64 {
    100
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_redirect_prefixes() -> Vec<String> {
    vec![
        "https://www.baidu.com/link?url=".to_string(),
        "http://www.baidu.com/link?url=".to_string(),
    ]
}
