//! The poll, transform, and write loop.
//!
//! # Design
//! - One sequential task: fetch, build, write, then sleep the poll interval.
//! - A failed cycle is logged and counted; the loop always moves on to the next one.
//! - Shutdown is observed between cycles, during the sleep, and inside retries.
//!   A write that has started is allowed to finish.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use torrentstat_core::{PointSink, RawStatusBatch, RpcClient};
use torrentstat_telemetry::{Metrics, STAGE_FETCH, STAGE_WRITE, cycle_span, record_cycle_points};
use tracing::{Instrument, Span, debug, info, warn};

use crate::builder::build_points;
use crate::fetcher::StatsFetcher;

/// What a single cycle accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A batch was handed to the sink.
    Written {
        /// Points in the batch.
        points: usize,
    },
    /// No status was available; an empty batch was handed to the sink.
    NoData,
    /// The cycle failed at `stage` ([`STAGE_FETCH`] or [`STAGE_WRITE`]).
    Failed {
        /// Pipeline stage that failed.
        stage: &'static str,
    },
    /// Shutdown was requested before the batch was written.
    Cancelled,
}

/// Totals returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorReport {
    /// Cycles that ran to completion or failed.
    pub cycles: u64,
    /// Points handed to the sink successfully.
    pub points_written: u64,
    /// Cycles that failed.
    pub failures: u64,
}

/// Drives the fetcher and the sink on a fixed cadence.
pub struct Collector<C, S> {
    fetcher: StatsFetcher<C>,
    sink: S,
    poll_interval: Duration,
    metrics: Metrics,
    shutdown: CancellationToken,
    cycle: u64,
}

impl<C: RpcClient, S: PointSink> Collector<C, S> {
    /// Build a collector; shutdown is signalled through the fetcher's retry token.
    #[must_use]
    pub fn new(
        fetcher: StatsFetcher<C>,
        sink: S,
        poll_interval: Duration,
        metrics: Metrics,
    ) -> Self {
        let shutdown = fetcher.caller().shutdown().clone();
        Self {
            fetcher,
            sink,
            poll_interval,
            metrics,
            shutdown,
            cycle: 0,
        }
    }

    /// Run cycles until shutdown is requested.
    pub async fn run(&mut self) -> CollectorReport {
        let mut report = CollectorReport::default();
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            fields = self.fetcher.fields().len(),
            "collector started"
        );

        while !self.shutdown.is_cancelled() {
            match self.run_cycle().await {
                CycleOutcome::Written { points } => {
                    report.cycles += 1;
                    report.points_written += u64::try_from(points).unwrap_or(u64::MAX);
                }
                CycleOutcome::NoData => report.cycles += 1,
                CycleOutcome::Failed { .. } => {
                    report.cycles += 1;
                    report.failures += 1;
                }
                CycleOutcome::Cancelled => break,
            }

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(
            cycles = report.cycles,
            points_written = report.points_written,
            failures = report.failures,
            "collector stopped"
        );
        report
    }

    /// Run one fetch, build, and write cycle without sleeping afterwards.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        let span = cycle_span(self.cycle);
        let started = Instant::now();
        let outcome = self.collect(&span).instrument(span.clone()).await;
        if outcome != CycleOutcome::Cancelled {
            self.metrics.observe_cycle(started.elapsed());
            debug!(cycle = self.cycle, metrics = ?self.metrics.snapshot(), "cycle metrics");
        }
        outcome
    }

    async fn collect(&self, span: &Span) -> CycleOutcome {
        let (raw, has_data) = match self.fetcher.get_stats().await {
            Ok(Some(raw)) => (raw, true),
            Ok(None) if self.shutdown.is_cancelled() => return CycleOutcome::Cancelled,
            Ok(None) => (RawStatusBatch::new(), false),
            Err(err) => {
                warn!(error = %err, "status fetch failed; skipping cycle");
                self.metrics.inc_cycle_failure(STAGE_FETCH);
                return CycleOutcome::Failed { stage: STAGE_FETCH };
            }
        };

        let batch = build_points(raw);
        let points = batch.len();
        record_cycle_points(span, points);

        if let Err(err) = self.sink.write(&batch).await {
            warn!(error = %err, points, "writing points failed; continuing");
            self.metrics.inc_cycle_failure(STAGE_WRITE);
            return CycleOutcome::Failed { stage: STAGE_WRITE };
        }
        self.metrics.record_points_written(points);
        info!(points, "collected {points} data points");

        if has_data {
            CycleOutcome::Written { points }
        } else {
            CycleOutcome::NoData
        }
    }
}
