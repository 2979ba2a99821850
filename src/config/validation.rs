//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `30s`, `1m`, `5m30s`, `100ms`, etc.
///
/// # Examples
///
/// ```
/// use checkstorm::config::parse_duration;
///
/// assert_eq!(parse_duration("5s").unwrap().as_secs(), 5);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// assert_eq!(parse_duration("1m30s").unwrap().as_secs(), 90);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Validate that `input` is an absolute http(s) URL with a host.
pub fn validate_base_url(input: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(input).map_err(|e| {
        ConfigError::ValidationError(format!("invalid base_url '{input}': {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "base_url scheme must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::ValidationError(format!(
            "base_url '{input}' has no host"
        )));
    }
    Ok(url)
}
