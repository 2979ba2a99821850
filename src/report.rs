//! Final run report.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::dispatcher::DispatchSummary;
use crate::stats::StatsSnapshot;

/// Summary printed once a run has finished or was cancelled.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FinalReport {
    /// Final statistics snapshot.
    pub stats: StatsSnapshot,
    /// Mean latency over probes that measured one.
    #[serde(with = "humantime_serde")]
    pub average_latency: Option<Duration>,
    /// Wall-clock duration of the run.
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Probes recorded per second of wall-clock time.
    pub throughput: f64,
    /// Whether the run was cancelled.
    pub cancelled: bool,
    /// Targets never attempted because of cancellation.
    pub skipped: u64,
    /// Probe tasks that panicked; their targets have no recorded outcome.
    pub panicked: u64,
}

impl FinalReport {
    /// Build the report from the final snapshot.
    pub fn new(stats: StatsSnapshot, elapsed: Duration, summary: &DispatchSummary) -> Self {
        let seconds = elapsed.as_secs_f64();
        let throughput = if seconds > 0.0 {
            stats.total as f64 / seconds
        } else {
            0.0
        };

        Self {
            stats,
            average_latency: stats.average_latency(),
            elapsed,
            throughput,
            cancelled: summary.cancelled,
            skipped: summary.skipped,
            panicked: summary.panicked,
        }
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        writeln!(f, "=== Final Results ===")?;
        if self.cancelled {
            writeln!(f, "Run cancelled: {} targets not attempted", self.skipped)?;
        }
        writeln!(f, "Total checked: {}", s.total)?;
        writeln!(f, "Success: {} ({:.2}%)", s.success, s.success_rate() * 100.0)?;
        writeln!(f, "Failures: {} ({:.2}%)", s.failure, s.failure_rate() * 100.0)?;
        writeln!(
            f,
            "Errors: {} ({:.2}%)",
            s.transport_errors,
            s.transport_error_rate() * 100.0
        )?;
        if s.construction_errors > 0 {
            writeln!(f, "Invalid requests: {}", s.construction_errors)?;
        }
        if self.panicked > 0 {
            writeln!(f, "Panicked: {} (no outcome recorded)", self.panicked)?;
        }
        if let Some(avg) = self.average_latency {
            writeln!(f, "Average latency: {avg:?}")?;
        }
        writeln!(f, "Total time: {:?}", self.elapsed)?;
        write!(f, "Throughput: {:.2} checks/second", self.throughput)
    }
}
