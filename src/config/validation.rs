use crate::config::types::{Config, ExtractionConfig, FetchConfig, HarvesterConfig, OutputConfig};
use crate::url::{Locator, Route};
use crate::ConfigError;
use url::Url;

/// Longest accepted pause between pages
const MAX_PAGE_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvester_config(&config.harvester)?;
    validate_fetch_config(&config.fetch)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.page_delay_ms > MAX_PAGE_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "page_delay_ms must be <= {}ms, got {}ms",
            MAX_PAGE_DELAY_MS, config.page_delay_ms
        )));
    }
    Ok(())
}

/// Validates fetch configuration, including every route template
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and 120, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // An empty marker would match every body and reject all content
    if config.error_marker.is_empty() {
        return Err(ConfigError::Validation(
            "error_marker cannot be empty".to_string(),
        ));
    }

    if config.routes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one route must be configured".to_string(),
        ));
    }

    for template in &config.routes {
        validate_route(template)?;
    }

    Ok(())
}

/// Checks that a template resolves to an http(s) URL for a sample target
fn validate_route(template: &str) -> Result<(), ConfigError> {
    if template.trim().is_empty() {
        return Err(ConfigError::InvalidRoute(
            "route template cannot be empty".to_string(),
        ));
    }

    let sample = Locator::parse("https://example.com/page?n=1")
        .map_err(|e| ConfigError::InvalidRoute(e.to_string()))?;

    Route::new(template)
        .resolve(&sample)
        .map_err(|e| ConfigError::InvalidRoute(format!("'{}': {}", template, e)))?;

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid extraction endpoint: {}", e)))?;

    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Extraction endpoint must use http or https, got '{}'",
            config.endpoint
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 3600 {
        return Err(ConfigError::Validation(format!(
            "extraction request_timeout_secs must be between 1 and 3600, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_output_tokens < 1 {
        return Err(ConfigError::Validation(format!(
            "max_output_tokens must be >= 1, got {}",
            config.max_output_tokens
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.export_path.is_empty() {
        return Err(ConfigError::Validation(
            "export_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_route() {
        assert!(validate_route("https://relay.example/raw?url=").is_ok());
        assert!(validate_route("https://relay.example/fetch/").is_ok());
        assert!(validate_route("http://127.0.0.1:8080/get?u={url}").is_ok());

        assert!(validate_route("").is_err());
        assert!(validate_route("relay.example/?url=").is_err());
        assert!(validate_route("ftp://relay.example/?url=").is_err());
    }

    #[test]
    fn test_page_delay_bounds() {
        let mut config = Config::default();
        config.harvester.page_delay_ms = 0;
        assert!(validate(&config).is_ok());

        config.harvester.page_delay_ms = MAX_PAGE_DELAY_MS + 1;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_fetch_timeouts() {
        let mut config = Config::default();
        config.fetch.request_timeout_secs = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.fetch.connect_timeout_secs = 500;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_error_marker_rejected() {
        let mut config = Config::default();
        config.fetch.error_marker.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_extraction_settings() {
        let mut config = Config::default();
        config.extraction.endpoint = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = Config::default();
        config.extraction.model = "  ".to_string();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.extraction.max_output_tokens = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.extraction.request_timeout_secs = 0;
        assert!(validate(&config).is_err());
        config.extraction.request_timeout_secs = 3600;
        assert!(validate(&config).is_ok());
    }
}
