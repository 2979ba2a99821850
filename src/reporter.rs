//! Periodic progress reporting.
//!
//! The reporter runs on its own task and only ever reads [`RunStats`]
//! snapshots, so it can never slow down probe dispatch.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::stats::{RunStats, StatsSnapshot};

/// Default progress interval (5 seconds).
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Minimum allowed progress interval (100 milliseconds).
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Destination for progress snapshots.
pub trait ProgressSink: Send + 'static {
    /// Receive one progress snapshot.
    fn emit(&mut self, snapshot: &StatsSnapshot);
}

impl<F> ProgressSink for F
where
    F: FnMut(&StatsSnapshot) + Send + 'static,
{
    fn emit(&mut self, snapshot: &StatsSnapshot) {
        self(snapshot)
    }
}

/// Writes one `[Progress]` line per snapshot to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Render the progress line for `snapshot`.
    pub fn format_line(snapshot: &StatsSnapshot) -> String {
        let avg = snapshot
            .average_latency()
            .map(|d| format!("{d:?}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "[Progress] Total: {} | Success: {} | Failures: {} | Errors: {} | Avg Latency: {}",
            snapshot.total, snapshot.success, snapshot.failure, snapshot.transport_errors, avg
        )
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&mut self, snapshot: &StatsSnapshot) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", Self::format_line(snapshot)) {
            tracing::warn!(error = %e, "Failed to write progress line");
        }
    }
}

/// Emits a snapshot of the run statistics on a fixed interval.
#[derive(Debug)]
pub struct ProgressReporter {
    stats: Arc<RunStats>,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter over `stats`.
    ///
    /// Interval is clamped to a minimum of 100 milliseconds.
    pub fn new(stats: Arc<RunStats>, interval: Duration) -> Self {
        let interval = if interval < MIN_REPORT_INTERVAL {
            tracing::warn!(min_interval = ?MIN_REPORT_INTERVAL,
                "Report interval is less than minimum allowed. Using minimum interval."
            );
            MIN_REPORT_INTERVAL
        } else {
            interval
        };
        Self { stats, interval }
    }

    /// Effective reporting interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start reporting until `done` is cancelled.
    ///
    /// The first line is emitted one full interval after spawning, and only
    /// once at least one probe was recorded. The task hands the sink back
    /// when it stops.
    pub fn spawn<S: ProgressSink>(self, mut sink: S, done: CancellationToken) -> JoinHandle<S> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = done.cancelled() => break,
                    _ = ticker.tick() => {
                        let snapshot = self.stats.snapshot();
                        tracing::trace!(total = snapshot.total, "Progress tick");
                        if snapshot.total > 0 {
                            sink.emit(&snapshot);
                        }
                    }
                }
            }

            tracing::debug!("Progress reporter stopped");
            sink
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Outcome, Target};
    use chrono::Utc;

    fn record_healthy(stats: &RunStats) {
        stats.record(&Outcome::from_status(
            Target::new("target-1", "http://127.0.0.1/health"),
            200,
            Duration::from_millis(4),
            Utc::now(),
        ));
    }

    /// Test sink that keeps every snapshot.
    #[derive(Default)]
    struct Collector(Vec<StatsSnapshot>);

    impl ProgressSink for Collector {
        fn emit(&mut self, snapshot: &StatsSnapshot) {
            self.0.push(*snapshot);
        }
    }

    #[test]
    fn test_interval_minimum() {
        let reporter = ProgressReporter::new(Arc::new(RunStats::new()), Duration::from_millis(1));
        assert_eq!(reporter.interval(), MIN_REPORT_INTERVAL);

        let reporter = ProgressReporter::new(Arc::new(RunStats::new()), Duration::from_secs(5));
        assert_eq!(reporter.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_console_line_format() {
        let stats = RunStats::new();
        record_healthy(&stats);
        let line = ConsoleSink::format_line(&stats.snapshot());
        assert_eq!(
            line,
            "[Progress] Total: 1 | Success: 1 | Failures: 0 | Errors: 0 | Avg Latency: 4ms"
        );

        let empty = ConsoleSink::format_line(&StatsSnapshot::default());
        assert!(empty.ends_with("Avg Latency: n/a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_lines_when_run_ends_before_first_tick() {
        let stats = Arc::new(RunStats::new());
        record_healthy(&stats);
        let done = CancellationToken::new();
        let handle =
            ProgressReporter::new(Arc::clone(&stats), Duration::from_secs(5))
                .spawn(Collector::default(), done.clone());

        tokio::time::sleep(Duration::from_secs(4)).await;
        done.cancel();

        let sink = handle.await.unwrap();
        assert!(sink.0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_on_each_tick_once_probes_recorded() {
        let stats = Arc::new(RunStats::new());
        let done = CancellationToken::new();
        let handle =
            ProgressReporter::new(Arc::clone(&stats), Duration::from_secs(1))
                .spawn(Collector::default(), done.clone());

        // Nothing recorded yet: the first tick stays silent.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        record_healthy(&stats);
        tokio::time::sleep(Duration::from_secs(1)).await;
        record_healthy(&stats);
        tokio::time::sleep(Duration::from_secs(1)).await;
        done.cancel();

        let sink = handle.await.unwrap();
        let totals: Vec<u64> = sink.0.iter().map(|s| s.total).collect();
        assert_eq!(totals, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_sink() {
        let stats = Arc::new(RunStats::new());
        record_healthy(&stats);
        let done = CancellationToken::new();

        let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
        let handle = ProgressReporter::new(Arc::clone(&stats), Duration::from_secs(1)).spawn(
            {
                let lines = Arc::clone(&lines);
                move |snapshot: &StatsSnapshot| {
                    lines.lock().unwrap().push(ConsoleSink::format_line(snapshot));
                }
            },
            done.clone(),
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        done.cancel();
        let _sink = handle.await.unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[Progress] Total: 1 |"));
    }
}
