//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters and gauges the collection loop reports.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{Result, TelemetryError};

/// Failure stage label for fetching stats from the daemon.
pub const STAGE_FETCH: &str = "fetch";
/// Failure stage label for writing points to the sink.
pub const STAGE_WRITE: &str = "write";

/// Prometheus-backed metrics registry shared by the collector components.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    cycles_total: IntCounter,
    points_written_total: IntCounter,
    rpc_retries_total: IntCounter,
    rpc_exhausted_total: IntCounter,
    cycle_failures_total: IntCounterVec,
    last_batch_points: IntGauge,
    last_cycle_duration_ms: IntGauge,
}

/// Snapshot of the collector counters and gauges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Completed collection cycles, successful or not.
    pub cycles_total: u64,
    /// Points handed to the sink successfully.
    pub points_written_total: u64,
    /// RPC attempts repeated after a reconnect failure.
    pub rpc_retries_total: u64,
    /// Calls that gave up after exhausting every attempt.
    pub rpc_exhausted_total: u64,
    /// Cycles whose fetch stage failed.
    pub fetch_failures_total: u64,
    /// Cycles whose write stage failed.
    pub write_failures_total: u64,
    /// Size of the most recent batch.
    pub last_batch_points: i64,
    /// Duration of the most recent cycle in milliseconds.
    pub last_cycle_duration_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the collector metrics registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cycles_total = counter("collector_cycles_total", "Collection cycles completed")?;
        let points_written_total = counter(
            "collector_points_written_total",
            "Points written to the time-series sink",
        )?;
        let rpc_retries_total = counter(
            "rpc_retries_total",
            "RPC attempts repeated after a reconnect failure",
        )?;
        let rpc_exhausted_total = counter(
            "rpc_exhausted_total",
            "RPC calls abandoned after exhausting every attempt",
        )?;
        let cycle_failures_total = IntCounterVec::new(
            Opts::new(
                "collector_cycle_failures_total",
                "Collection cycles that failed, by stage",
            ),
            &["stage"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "collector_cycle_failures_total",
            source,
        })?;
        let last_batch_points = gauge(
            "collector_last_batch_points",
            "Points in the most recent batch",
        )?;
        let last_cycle_duration_ms = gauge(
            "collector_last_cycle_duration_ms",
            "Duration of the most recent collection cycle (ms)",
        )?;

        register(&registry, "collector_cycles_total", &cycles_total)?;
        register(
            &registry,
            "collector_points_written_total",
            &points_written_total,
        )?;
        register(&registry, "rpc_retries_total", &rpc_retries_total)?;
        register(&registry, "rpc_exhausted_total", &rpc_exhausted_total)?;
        register(
            &registry,
            "collector_cycle_failures_total",
            &cycle_failures_total,
        )?;
        register(&registry, "collector_last_batch_points", &last_batch_points)?;
        register(
            &registry,
            "collector_last_cycle_duration_ms",
            &last_cycle_duration_ms,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                cycles_total,
                points_written_total,
                rpc_retries_total,
                rpc_exhausted_total,
                cycle_failures_total,
                last_batch_points,
                last_cycle_duration_ms,
            }),
        })
    }

    /// Record a finished cycle and how long it took.
    pub fn observe_cycle(&self, duration: Duration) {
        self.inner.cycles_total.inc();
        self.inner
            .last_cycle_duration_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Record a batch handed to the sink successfully.
    pub fn record_points_written(&self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.inner.points_written_total.inc_by(count);
        self.inner
            .last_batch_points
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Increment the reconnect retry counter.
    pub fn inc_rpc_retry(&self) {
        self.inner.rpc_retries_total.inc();
    }

    /// Increment the counter of calls abandoned after every attempt failed.
    pub fn inc_rpc_exhausted(&self) {
        self.inner.rpc_exhausted_total.inc();
    }

    /// Increment the failure counter for a pipeline stage ([`STAGE_FETCH`], [`STAGE_WRITE`]).
    pub fn inc_cycle_failure(&self, stage: &str) {
        self.inner
            .cycle_failures_total
            .with_label_values(&[stage])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of every collector metric.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_total: self.inner.cycles_total.get(),
            points_written_total: self.inner.points_written_total.get(),
            rpc_retries_total: self.inner.rpc_retries_total.get(),
            rpc_exhausted_total: self.inner.rpc_exhausted_total.get(),
            fetch_failures_total: self.cycle_failures(STAGE_FETCH),
            write_failures_total: self.cycle_failures(STAGE_WRITE),
            last_batch_points: self.inner.last_batch_points.get(),
            last_cycle_duration_ms: self.inner.last_cycle_duration_ms.get(),
        }
    }

    /// Failures recorded for a single stage.
    #[must_use]
    pub fn cycle_failures(&self, stage: &str) -> u64 {
        self.inner
            .cycle_failures_total
            .with_label_values(&[stage])
            .get()
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
