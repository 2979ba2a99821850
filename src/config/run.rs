//! Run configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::dispatcher::DEFAULT_CONCURRENCY;
use crate::probe::HttpProbeConfig;
use crate::probe::http::{
    DEFAULT_POOL_IDLE_TIMEOUT, DEFAULT_POOL_MAX_IDLE_PER_HOST, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT,
};
use crate::reporter::DEFAULT_REPORT_INTERVAL;
use crate::targets::{DEFAULT_COUNT, DEFAULT_PATH};

use super::validation::{ConfigError, validate_base_url};

/// Default base URL of the probed service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

// =============================================================================
// Output Format
// =============================================================================

/// Final report rendering.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Human-readable summary block.
    #[default]
    Text,
    /// Single JSON document.
    Json,
}

// =============================================================================
// Pool Configuration
// =============================================================================

/// HTTP connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle connections kept per host (default: 100).
    pub max_idle_per_host: usize,

    /// How long an idle connection is kept (default: 90s).
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
        }
    }
}

// =============================================================================
// Run Configuration
// =============================================================================

/// Top-level configuration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base URL of the probed service (default: "http://localhost:8080").
    pub base_url: String,

    /// Path appended to `base_url` (default: "/health").
    pub path: String,

    /// Number of targets to generate (default: 100000).
    pub count: usize,

    /// Maximum probes in flight (default: 1000).
    pub concurrency: usize,

    /// Per-probe deadline (default: 5s).
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Progress line interval (default: 5s).
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,

    /// User-Agent header sent with every probe.
    pub user_agent: String,

    /// Connection pool settings.
    pub pool: PoolConfig,

    /// Final report format (default: text).
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_PATH.to_string(),
            count: DEFAULT_COUNT,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            report_interval: DEFAULT_REPORT_INTERVAL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pool: PoolConfig::default(),
            format: OutputFormat::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a YAML file.
    ///
    /// Missing keys fall back to defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;

        if self.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency must be positive".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "timeout must be non-zero".to_string(),
            ));
        }

        if self.report_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "report_interval must be non-zero".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "user_agent must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// HTTP probe settings derived from this configuration.
    pub fn probe_config(&self) -> HttpProbeConfig {
        HttpProbeConfig::default()
            .with_timeout(self.timeout)
            .with_pool_max_idle_per_host(self.pool.max_idle_per_host)
            .with_pool_idle_timeout(self.pool.idle_timeout)
            .with_user_agent(self.user_agent.clone())
    }
}
