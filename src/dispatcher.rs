//! Bounded-concurrency probe dispatcher.
//!
//! The dispatcher admits one probe per [`Target`] through a fixed pool of
//! semaphore permits. Each admitted probe runs on its own Tokio task, records
//! its [`Outcome`] into the shared [`RunStats`] and releases its permit when
//! the task ends, including on panic.
//!
//! `run` is a barrier: it returns only once every spawned task was joined,
//! so a snapshot taken afterwards accounts for every attempted target.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::probe::{Outcome, Probe, Target};
use crate::stats::RunStats;

/// Default concurrency ceiling.
pub const DEFAULT_CONCURRENCY: usize = 1000;

/// What happened during one [`Dispatcher::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Targets admitted and handed to a probe.
    pub dispatched: u64,
    /// Targets never attempted because the run was cancelled.
    pub skipped: u64,
    /// Probe tasks that panicked instead of returning an outcome.
    pub panicked: u64,
    /// Whether the cancellation token fired before all targets were admitted.
    pub cancelled: bool,
}

/// Runs probes with at most `concurrency` in flight.
pub struct Dispatcher<P: Probe> {
    probe: Arc<P>,
    stats: Arc<RunStats>,
    concurrency: usize,
    check_timeout: Duration,
    outcome_feed: Option<mpsc::Sender<Outcome>>,
}

impl<P: Probe> Dispatcher<P> {
    /// Create a dispatcher with a fresh [`RunStats`].
    ///
    /// A ceiling of zero is raised to one.
    pub fn new(probe: P, concurrency: usize, check_timeout: Duration) -> Self {
        let concurrency = if concurrency == 0 {
            tracing::warn!("Concurrency ceiling of 0 requested, using 1");
            1
        } else {
            concurrency.min(Semaphore::MAX_PERMITS)
        };

        Self {
            probe: Arc::new(probe),
            stats: Arc::new(RunStats::new()),
            concurrency,
            check_timeout,
            outcome_feed: None,
        }
    }

    /// Offer every outcome to `feed` as well.
    ///
    /// Outcomes are sent with `try_send`: a full or closed channel drops the
    /// outcome instead of stalling a worker.
    pub fn with_outcome_feed(mut self, feed: mpsc::Sender<Outcome>) -> Self {
        self.outcome_feed = Some(feed);
        self
    }

    /// Shared statistics for this dispatcher.
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// The concurrency ceiling in effect.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The per-check deadline handed to every probe.
    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    /// Probe every target, then wait for all probes to finish.
    ///
    /// Once `cancel` fires, no more targets are admitted. Probes already in
    /// flight see the same token, record a cancelled outcome and are joined
    /// before this returns.
    pub async fn run<I>(&self, targets: I, cancel: &CancellationToken) -> DispatchSummary
    where
        I: IntoIterator<Item = Target>,
    {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut summary = DispatchSummary::default();
        let mut targets = targets.into_iter();

        tracing::debug!(
            concurrency = self.concurrency,
            timeout_ms = self.check_timeout.as_millis(),
            "Dispatching probes"
        );

        while let Some(target) = targets.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                summary.cancelled = true;
                summary.skipped = 1 + targets.by_ref().count() as u64;
                break;
            };

            // Keep the join set bounded by the ceiling.
            while let Some(result) = tasks.try_join_next() {
                self.reap(result, &mut summary);
            }

            let probe = Arc::clone(&self.probe);
            let stats = Arc::clone(&self.stats);
            let feed = self.outcome_feed.clone();
            let cancel = cancel.clone();
            let deadline = self.check_timeout;

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = probe.check(target, deadline, &cancel).await;
                stats.record(&outcome);
                if let Some(feed) = feed
                    && let Err(e) = feed.try_send(outcome)
                {
                    tracing::trace!(error = %e, "Outcome feed dropped an outcome");
                }
            });
            summary.dispatched += 1;
        }

        while let Some(result) = tasks.join_next().await {
            self.reap(result, &mut summary);
        }

        if summary.cancelled {
            tracing::info!(
                dispatched = summary.dispatched,
                skipped = summary.skipped,
                "Dispatch cancelled"
            );
        } else {
            tracing::debug!(dispatched = summary.dispatched, "Dispatch complete");
        }
        summary
    }

    fn reap(&self, result: Result<(), JoinError>, summary: &mut DispatchSummary) {
        if let Err(e) = result {
            summary.panicked += 1;
            tracing::error!(error = %e, "Probe task failed");
        }
    }
}

impl<P: Probe> std::fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("concurrency", &self.concurrency)
            .field("check_timeout", &self.check_timeout)
            .finish_non_exhaustive()
    }
}
