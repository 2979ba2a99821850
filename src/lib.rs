//! Checkstorm - Bounded-Concurrency HTTP Liveness Prober
//!
//! This crate probes a large list of HTTP targets with a fixed ceiling on
//! in-flight requests, aggregates the outcomes into one consistent set of
//! counters and reports progress while the run is going. It can be used as a
//! library or run as the standalone `checkstorm` binary.
//!
//! # Architecture
//!
//! - **Probe**: one GET per target over a shared, pooled HTTP client
//! - **Dispatcher**: semaphore-bounded admission of probes onto Tokio tasks
//! - **Stats**: mutex-guarded counters with consistent snapshots
//! - **Reporter**: periodic progress lines read from snapshots
//! - **Report**: final summary as text or JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use checkstorm::{Dispatcher, HttpProbe, HttpProbeConfig, targets};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), checkstorm::RunError> {
//! let config = HttpProbeConfig::default();
//! let probe = HttpProbe::new(&config)?;
//! let dispatcher = Dispatcher::new(probe, 100, config.timeout);
//!
//! let list = targets::generate("http://localhost:8080", "/health", 1_000);
//! dispatcher.run(list, &CancellationToken::new()).await;
//!
//! println!("{:?}", dispatcher.stats().snapshot());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
mod error;
pub mod probe;
pub mod report;
pub mod reporter;
pub mod stats;
pub mod targets;

pub use config::{ConfigError, OutputFormat, RunConfig};
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use error::RunError;
pub use probe::{HttpProbe, HttpProbeConfig, Outcome, Probe, ProbeError, Target};
pub use report::FinalReport;
pub use reporter::{ConsoleSink, ProgressReporter, ProgressSink};
pub use stats::{RunStats, StatsSnapshot};
