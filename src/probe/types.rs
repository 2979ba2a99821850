//! Probe request and result types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeError;

/// Lowest HTTP status considered healthy (inclusive).
pub const HEALTHY_STATUS_MIN: u16 = 200;

/// Highest HTTP status considered healthy (exclusive).
///
/// Redirects (3xx) are healthy; only 4xx/5xx are not.
pub const HEALTHY_STATUS_MAX: u16 = 400;

/// Whether an HTTP status code counts as a healthy probe.
pub fn is_healthy_status(status: u16) -> bool {
    (HEALTHY_STATUS_MIN..HEALTHY_STATUS_MAX).contains(&status)
}

/// One probe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Caller-assigned unique identifier.
    pub id: String,
    /// Absolute URL to GET.
    pub destination: String,
}

impl Target {
    /// Create a new target.
    pub fn new(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
        }
    }
}

/// Result of probing one [`Target`].
///
/// `latency` is `None` only when the request could not be constructed, so such
/// probes never pull the average latency toward zero.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// The probed target.
    pub target: Target,
    /// `true` iff a response arrived with a status in `[200, 400)`.
    pub success: bool,
    /// Wall-clock time from request start to response drained or failure.
    #[serde(with = "humantime_serde")]
    pub latency: Option<Duration>,
    /// Failure descriptor when no usable response was received.
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<ProbeError>,
    /// HTTP status code, when a response arrived.
    pub status: Option<u16>,
    /// When the probe started (UTC).
    pub observed_at: DateTime<Utc>,
}

impl Outcome {
    /// Outcome for a received response; success follows the status policy.
    pub fn from_status(
        target: Target,
        status: u16,
        latency: Duration,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target,
            success: is_healthy_status(status),
            latency: Some(latency),
            failure: None,
            status: Some(status),
            observed_at,
        }
    }

    /// Outcome for a probe that never produced a response.
    pub fn failed(
        target: Target,
        failure: ProbeError,
        latency: Option<Duration>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target,
            success: false,
            latency,
            failure: Some(failure),
            status: None,
            observed_at,
        }
    }

    /// Whether the failure (if any) reached the transport layer.
    pub fn is_transport_error(&self) -> bool {
        self.failure.as_ref().is_some_and(ProbeError::is_transport)
    }

    /// Whether the request could not even be built.
    pub fn is_construction_error(&self) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| matches!(f, ProbeError::InvalidRequest(_)))
    }
}

fn serialize_failure<S>(failure: &Option<ProbeError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match failure {
        Some(f) => serializer.serialize_some(&f.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_status_policy() {
        assert!(!is_healthy_status(199));
        assert!(is_healthy_status(200));
        assert!(is_healthy_status(204));
        assert!(is_healthy_status(301));
        assert!(is_healthy_status(399));
        assert!(!is_healthy_status(400));
        assert!(!is_healthy_status(404));
        assert!(!is_healthy_status(503));
    }

    #[test]
    fn test_outcome_from_status() {
        let target = Target::new("target-1", "http://127.0.0.1/health");
        let ok = Outcome::from_status(target.clone(), 302, Duration::from_millis(3), Utc::now());
        assert!(ok.success);
        assert_eq!(ok.status, Some(302));
        assert!(ok.failure.is_none());

        let unhealthy = Outcome::from_status(target, 500, Duration::from_millis(3), Utc::now());
        assert!(!unhealthy.success);
        assert!(!unhealthy.is_transport_error());
        assert!(!unhealthy.is_construction_error());
        assert_eq!(unhealthy.latency, Some(Duration::from_millis(3)));
    }

    #[test]
    fn test_outcome_failed_classification() {
        let target = Target::new("target-2", "::not a url::");
        let invalid = Outcome::failed(
            target.clone(),
            ProbeError::InvalidRequest("relative URL".into()),
            None,
            Utc::now(),
        );
        assert!(!invalid.success);
        assert!(invalid.is_construction_error());
        assert!(!invalid.is_transport_error());
        assert!(invalid.latency.is_none());

        let refused = Outcome::failed(
            target,
            ProbeError::Transport("connection refused".into()),
            Some(Duration::from_millis(1)),
            Utc::now(),
        );
        assert!(refused.is_transport_error());
        assert!(!refused.is_construction_error());
    }

    #[test]
    fn test_outcome_serializes_failure_as_text() {
        let outcome = Outcome::failed(
            Target::new("target-3", "http://127.0.0.1:1/health"),
            ProbeError::Cancelled,
            Some(Duration::from_millis(10)),
            Utc::now(),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failure"], "probe cancelled");
        assert_eq!(json["latency"], "10ms");
        assert_eq!(json["target"]["id"], "target-3");
    }
}
