//! Configuration module for checkstorm runs.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Target generation (base URL, path, count)
//! - Dispatch settings (concurrency ceiling, per-probe timeout)
//! - HTTP client pool settings
//! - Progress and final report output

mod run;
mod validation;

pub use run::{OutputFormat, PoolConfig, RunConfig};
pub use validation::{ConfigError, parse_duration, validate_base_url};

pub use run::DEFAULT_BASE_URL;
