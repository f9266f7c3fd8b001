use crate::config::types::{Config, DomainEntry, OutputConfig, QueueConfig, SearchConfig};
use crate::ConfigError;
use url::Url;

/// Placeholder substituted with each keyword in the base URL template
pub const KEYWORD_PLACEHOLDER: &str = "$keyword";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_queue_config(&config.queue)?;
    validate_output_config(&config.output)?;
    validate_redirect_prefixes(&config.filter.redirect_prefixes)?;
    validate_blacklist_domains(&config.blacklist)?;
    Ok(())
}

/// Validates backend selection, template and worker count
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let template = config.resolved_base_url().ok_or_else(|| {
        ConfigError::Validation(format!(
            "engine '{}' has no default base-url; set search.base-url",
            config.engine
        ))
    })?;
    validate_base_url(template)?;

    if config.routine_count < 1 || config.routine_count > 512 {
        return Err(ConfigError::Validation(format!(
            "routine-count must be between 1 and 512, got {}",
            config.routine_count
        )));
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a query URL template
///
/// The template must contain the `$keyword` placeholder and must parse as an
/// http(s) URL once a keyword has been substituted.
pub fn validate_base_url(template: &str) -> Result<(), ConfigError> {
    if !template.contains(KEYWORD_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must contain the {} placeholder",
            template, KEYWORD_PLACEHOLDER
        )));
    }

    let sample = template.replace(KEYWORD_PLACEHOLDER, "test");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", template, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            template
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            template
        )));
    }

    // Every backend carries the keyword in `wd` or `q`
    if crate::backend::keyword_of(&sample).as_deref() != Some("test") {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must carry {} in a 'wd' or 'q' query parameter",
            template, KEYWORD_PLACEHOLDER
        )));
    }

    Ok(())
}

fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.work_capacity < 1 {
        return Err(ConfigError::Validation(
            "work-capacity must be >= 1".to_string(),
        ));
    }

    if config.result_capacity < 1 {
        return Err(ConfigError::Validation(
            "result-capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.progress_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "progress-interval-ms must be >= 10ms, got {}ms",
            config.progress_interval_ms
        )));
    }

    Ok(())
}

fn validate_redirect_prefixes(prefixes: &[String]) -> Result<(), ConfigError> {
    for prefix in prefixes {
        if !prefix.starts_with("http://") && !prefix.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(format!(
                "redirect prefix '{}' must start with http:// or https://",
                prefix
            )));
        }
    }
    Ok(())
}

/// Validates blacklist domain entries
fn validate_blacklist_domains(domains: &[DomainEntry]) -> Result<(), ConfigError> {
    for entry in domains {
        validate_domain_pattern(&entry.domain)?;
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    validate_domain_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
