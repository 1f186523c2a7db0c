use crate::config::types::{
    Config, ExternalCrawlDefaults, PollErrorPolicy, PollingConfig, RegionCrawlDefaults,
    ServiceConfig,
};
use crate::request::Region;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    validate_polling_config(&config.polling)?;
    validate_region_defaults(&config.region_crawl)?;
    validate_external_defaults(&config.external_crawl)?;
    Ok(())
}

/// Validates the job service configuration
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.connect_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_ms must be >= 100ms, got {}ms",
            config.connect_timeout_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates polling configuration
fn validate_polling_config(config: &PollingConfig) -> Result<(), ConfigError> {
    if config.interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "interval_ms must be >= 10ms, got {}ms",
            config.interval_ms
        )));
    }

    // The failure budget and backoff cap are only consulted by the retry policy
    if config.on_error == PollErrorPolicy::Retry {
        if config.max_consecutive_failures < 1 {
            return Err(ConfigError::Validation(format!(
                "max_consecutive_failures must be >= 1, got {}",
                config.max_consecutive_failures
            )));
        }

        if config.backoff_max_ms < config.interval_ms {
            return Err(ConfigError::Validation(format!(
                "backoff_max_ms ({}ms) must be >= interval_ms ({}ms)",
                config.backoff_max_ms, config.interval_ms
            )));
        }
    }

    Ok(())
}

fn validate_region_defaults(config: &RegionCrawlDefaults) -> Result<(), ConfigError> {
    validate_region(&config.prefecture)?;
    validate_max_pages(config.max_pages)
}

fn validate_external_defaults(config: &ExternalCrawlDefaults) -> Result<(), ConfigError> {
    validate_region(&config.location)?;
    validate_max_pages(config.max_pages)
}

fn validate_region(name: &str) -> Result<(), ConfigError> {
    Region::parse(name)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(e.to_string()))
}

fn validate_max_pages(max_pages: u32) -> Result<(), ConfigError> {
    if max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            max_pages
        )));
    }
    Ok(())
}
