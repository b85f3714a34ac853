use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Backend section exists (enforced by serde)
/// - Server port is not 0
/// - Backend URL is an absolute http(s) URL and the timeout is positive
/// - Poll interval and fault threshold are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    // Backend validation
    let url = reqwest::Url::parse(&config.backend.url)
        .map_err(|e| invalid(format!("backend.url is not a valid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "backend.url must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if config.backend.timeout_secs == 0 {
        return Err(invalid("backend.timeout_secs cannot be 0"));
    }

    // Poller validation
    if config.poller.interval_ms == 0 {
        return Err(invalid("poller.interval_ms cannot be 0"));
    }
    if config.poller.max_consecutive_faults == 0 {
        return Err(invalid("poller.max_consecutive_faults cannot be 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
