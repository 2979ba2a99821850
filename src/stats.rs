//! Run statistics aggregator.
//!
//! [`RunStats`] is the only shared mutable state touched by probe workers.
//! Every counter and the latency accumulator live behind one mutex, so a
//! [`StatsSnapshot`] is always internally consistent:
//!
//! - `total == success + failure`
//! - `transport_errors + construction_errors <= failure`
//! - `latency_samples <= total`

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::probe::Outcome;

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Probes recorded.
    pub total: u64,
    /// Probes with a healthy response.
    pub success: u64,
    /// Probes that were not healthy, for any reason.
    pub failure: u64,
    /// Failures that reached the transport (refused, timeout, TLS, cancelled).
    pub transport_errors: u64,
    /// Failures where the request could not be built.
    pub construction_errors: u64,
    /// Probes that contributed to `cumulative_latency`.
    pub latency_samples: u64,
    /// Sum of measured latencies.
    #[serde(with = "humantime_serde")]
    pub cumulative_latency: Duration,
}

impl StatsSnapshot {
    /// Mean latency over probes that actually measured one.
    pub fn average_latency(&self) -> Option<Duration> {
        if self.latency_samples == 0 {
            return None;
        }
        let nanos = self.cumulative_latency.as_nanos() / u128::from(self.latency_samples);
        Some(Duration::from_nanos(
            u64::try_from(nanos).unwrap_or(u64::MAX),
        ))
    }

    /// Fraction of probes that succeeded (0 when nothing was recorded).
    pub fn success_rate(&self) -> f64 {
        ratio(self.success, self.total)
    }

    /// Fraction of probes that failed.
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failure, self.total)
    }

    /// Fraction of probes that failed at the transport layer.
    pub fn transport_error_rate(&self) -> f64 {
        ratio(self.transport_errors, self.total)
    }

    /// Check the snapshot invariants.
    pub fn is_consistent(&self) -> bool {
        self.total == self.success + self.failure
            && self.transport_errors + self.construction_errors <= self.failure
            && self.latency_samples <= self.total
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Concurrency-safe accumulator shared by all probe workers of a run.
#[derive(Debug, Default)]
pub struct RunStats {
    inner: Mutex<StatsSnapshot>,
}

impl RunStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome into the counters.
    pub fn record(&self, outcome: &Outcome) {
        let mut stats = self.lock();

        stats.total += 1;
        if outcome.success {
            stats.success += 1;
        } else {
            stats.failure += 1;
        }

        if outcome.is_transport_error() {
            stats.transport_errors += 1;
        } else if outcome.is_construction_error() {
            stats.construction_errors += 1;
        }

        if let Some(latency) = outcome.latency {
            stats.cumulative_latency = stats.cumulative_latency.saturating_add(latency);
            stats.latency_samples += 1;
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        *self.lock()
    }

    // Counters stay valid even if a holder panicked mid-update; every update
    // completes before the guard drops.
    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, Target};
    use chrono::Utc;
    use std::sync::Arc;

    fn target() -> Target {
        Target::new("target-1", "http://127.0.0.1/health")
    }

    fn healthy(ms: u64) -> Outcome {
        Outcome::from_status(target(), 200, Duration::from_millis(ms), Utc::now())
    }

    fn unhealthy(ms: u64) -> Outcome {
        Outcome::from_status(target(), 503, Duration::from_millis(ms), Utc::now())
    }

    fn refused(ms: u64) -> Outcome {
        Outcome::failed(
            target(),
            ProbeError::Transport("connection refused".into()),
            Some(Duration::from_millis(ms)),
            Utc::now(),
        )
    }

    fn malformed() -> Outcome {
        Outcome::failed(
            target(),
            ProbeError::InvalidRequest("relative URL without a base".into()),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = RunStats::new().snapshot();
        assert_eq!(snapshot, StatsSnapshot::default());
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.average_latency(), None);
        assert_eq!(snapshot.success_rate(), 0.0);
        assert_eq!(snapshot.failure_rate(), 0.0);
        assert_eq!(snapshot.transport_error_rate(), 0.0);
    }

    #[test]
    fn test_record_classifies_outcomes() {
        let stats = RunStats::new();
        stats.record(&healthy(10));
        stats.record(&unhealthy(20));
        stats.record(&refused(30));
        stats.record(&malformed());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.failure, 3);
        assert_eq!(snapshot.transport_errors, 1);
        assert_eq!(snapshot.construction_errors, 1);
        assert_eq!(snapshot.latency_samples, 3);
        assert_eq!(snapshot.cumulative_latency, Duration::from_millis(60));
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_construction_failures_do_not_skew_average() {
        let stats = RunStats::new();
        stats.record(&healthy(100));
        for _ in 0..9 {
            stats.record(&malformed());
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 10);
        assert_eq!(snapshot.average_latency(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let stats = RunStats::new();
        stats.record(&healthy(5));
        stats.record(&refused(7));

        assert_eq!(stats.snapshot(), stats.snapshot());
    }

    #[test]
    fn test_rates() {
        let stats = RunStats::new();
        stats.record(&healthy(1));
        stats.record(&healthy(1));
        stats.record(&healthy(1));
        stats.record(&refused(1));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.success_rate(), 0.75);
        assert_eq!(snapshot.failure_rate(), 0.25);
        assert_eq!(snapshot.transport_error_rate(), 0.25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record_loses_no_updates() {
        const WORKERS: u64 = 32;
        const PER_WORKER: u64 = 500;

        let stats = Arc::new(RunStats::new());
        let reader = {
            let stats = Arc::clone(&stats);
            tokio::spawn(async move {
                for _ in 0..1_000 {
                    assert!(stats.snapshot().is_consistent());
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut handles = Vec::new();
        for worker in 0..WORKERS {
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                for i in 0..PER_WORKER {
                    let outcome = if (worker + i) % 2 == 0 {
                        healthy(1)
                    } else {
                        refused(1)
                    };
                    stats.record(&outcome);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        reader.await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, WORKERS * PER_WORKER);
        assert_eq!(snapshot.success + snapshot.failure, snapshot.total);
        assert_eq!(snapshot.success, WORKERS * PER_WORKER / 2);
        assert_eq!(snapshot.transport_errors, snapshot.failure);
        assert_eq!(
            snapshot.cumulative_latency,
            Duration::from_millis(WORKERS * PER_WORKER)
        );
    }
}
