//! Probe Layer
//!
//! A probe performs exactly one liveness check for a [`Target`] and always
//! returns an [`Outcome`]. Failures are data, not errors.
//!
//! # Architecture
//!
//! - [`Probe`]: Core trait for single-shot checks (injectable in tests)
//! - [`HttpProbe`]: GET over a shared, pooled `reqwest` client
//! - [`ProbeError`]: Failure descriptor carried inside an [`Outcome`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use checkstorm::{HttpProbe, HttpProbeConfig, Probe, Target};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let probe = HttpProbe::new(&HttpProbeConfig::default())?;
//! let cancel = CancellationToken::new();
//! let outcome = probe
//!     .check(Target::new("api", "http://localhost:8080/health"), Duration::from_secs(5), &cancel)
//!     .await;
//! println!("healthy: {}", outcome.success);
//! # Ok(())
//! # }
//! ```

pub mod http;
mod traits;
mod types;

pub use http::{HttpProbe, HttpProbeConfig};
pub use traits::{Probe, ProbeError};
pub use types::{HEALTHY_STATUS_MAX, HEALTHY_STATUS_MIN, Outcome, Target, is_healthy_status};
