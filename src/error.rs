//! Run-level error types.
//!
//! These abort a run before any probe is dispatched. Failures of individual
//! probes never surface here; they are recorded as [`crate::Outcome`]s.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that prevent a run from starting.
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
