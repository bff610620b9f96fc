use crate::config::types::{BrowserConfig, Config, CrawlerConfig, OutputConfig, SearchConfig};
use crate::source::SourceAdapter;
use crate::ConfigError;
use url::Url;

/// Largest accepted detail worker pool
const MAX_WORKERS: usize = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    for adapter in &config.custom_source {
        validate_custom_source(adapter)?;
    }
    validate_sources(config)?;
    Ok(())
}

/// Validates the search terms
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.titles.is_empty() || config.titles.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "search.titles must contain at least one non-empty title".to_string(),
        ));
    }

    if config.locations.is_empty() {
        return Err(ConfigError::Validation(
            "search.locations must contain at least one location".to_string(),
        ));
    }

    if config.limit == Some(0) {
        return Err(ConfigError::Validation(
            "search.limit must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    for (key, value) in [
        ("navigation-timeout-ms", config.navigation_timeout_ms),
        ("results-timeout-ms", config.results_timeout_ms),
        ("detail-timeout-ms", config.detail_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", key)));
        }
    }

    if config.max_passes < 1 {
        return Err(ConfigError::Validation(format!(
            "max-passes must be >= 1, got {}",
            config.max_passes
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.default_query_quota < 1 {
        return Err(ConfigError::Validation(format!(
            "default-query-quota must be >= 1, got {}",
            config.default_query_quota
        )));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser.user-agent cannot be empty".to_string(),
        ));
    }
    if config.operation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "browser.operation-timeout-ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a source declared in the configuration
fn validate_custom_source(adapter: &SourceAdapter) -> Result<(), ConfigError> {
    if adapter.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "custom-source name cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&adapter.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid base-url '{}' for source '{}': {}",
            adapter.base_url, adapter.name, e
        ))
    })?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url for source '{}' must use http or https",
            adapter.name
        )));
    }

    if !adapter.search_url.contains("{title}") {
        return Err(ConfigError::Validation(format!(
            "search-url for source '{}' must contain {{title}}",
            adapter.name
        )));
    }

    if adapter.listing.result_item.is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' needs at least one result-item selector",
            adapter.name
        )));
    }

    if adapter.listing.link.is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' needs at least one link locator",
            adapter.name
        )));
    }

    Ok(())
}

/// Checks every selected source resolves to a preset or custom adapter
fn validate_sources(config: &Config) -> Result<(), ConfigError> {
    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "sources must name at least one source".to_string(),
        ));
    }
    config.adapters().map(|_| ())
}
