//! Core probe trait and failure descriptor.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::probe::{Outcome, Target};

/// Why a single probe failed.
///
/// This is a failure *descriptor* carried inside an [`Outcome`], never an
/// error that aborts a run. It is `Clone` so outcomes can be fanned out to
/// several consumers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The request could not be built (malformed or unsupported destination).
    /// The network was never touched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection refused, DNS failure, TLS failure, reset, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-check deadline elapsed.
    #[error("timeout elapsed after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled while the request was in flight.
    #[error("probe cancelled")]
    Cancelled,
}

impl ProbeError {
    /// Whether the request reached the transport before failing.
    ///
    /// Everything except [`ProbeError::InvalidRequest`] counts as a transport
    /// error in the run statistics.
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

/// A single-shot liveness check.
///
/// Implementations must be infallible at the boundary: every failure mode is
/// folded into the returned [`Outcome`]. They must not touch shared run state;
/// the caller records the outcome.
///
/// The `cancel` token is the run-wide cancellation signal. Implementations
/// should return promptly with [`ProbeError::Cancelled`] once it fires.
#[async_trait::async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Perform exactly one check of `target`, giving up after `deadline`.
    async fn check(&self, target: Target, deadline: Duration, cancel: &CancellationToken)
    -> Outcome;
}
