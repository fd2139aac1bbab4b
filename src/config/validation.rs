use crate::config::types::{
    ArchiverConfig, BrowserConfig, Config, FetcherConfig, OutputConfig, SourceConfig,
};
use crate::ConfigError;
use url::Url;

/// Largest worker pool the archiver accepts
const MAX_POOL_SIZE: u32 = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_archiver_config(&config.archiver)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    validate_source_config(&config.source)?;
    Ok(())
}

/// Validates archive pipeline configuration
fn validate_archiver_config(config: &ArchiverConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and {}, got {}",
            MAX_POOL_SIZE, config.pool_size
        )));
    }

    if config.host_rate_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "host_rate_limit must be >= 1, got {}",
            config.host_rate_limit
        )));
    }

    if config.max_lightweight_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_lightweight_attempts must be >= 1, got {}",
            config.max_lightweight_attempts
        )));
    }

    if config.backoff_initial_ms == 0 {
        return Err(ConfigError::Validation(
            "backoff_initial_ms must be > 0".to_string(),
        ));
    }

    if config.backoff_initial_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_initial_ms ({}) must not exceed backoff_max_ms ({})",
            config.backoff_initial_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}

/// Validates lightweight fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be > 0".to_string(),
        ));
    }

    Url::parse(&config.referer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;

    if let Some(path) = &config.user_agents_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "user_agents_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates headless browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates bookmark source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.bookmarks_path.is_empty() {
        return Err(ConfigError::Validation(
            "bookmarks_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
