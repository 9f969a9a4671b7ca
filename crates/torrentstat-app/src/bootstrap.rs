//! Process wiring: configuration, telemetry, collaborators, and shutdown.

use std::str::FromStr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use torrentstat_config::CollectorConfig;
use torrentstat_core::{PointSink, RpcClient};
use torrentstat_deluge::DelugeWebClient;
use torrentstat_influx::InfluxSink;
use torrentstat_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging, record_app_mode,
};
use tracing::{debug, info, warn};

use crate::caller::{ResilientCaller, RetryPolicy};
use crate::collector::Collector;
use crate::error::{AppError, AppResult};
use crate::fetcher::StatsFetcher;

/// Entry point for the collector process.
///
/// # Errors
///
/// Returns an error if configuration, telemetry, or the initial connection to
/// either collaborator fails.
pub async fn run_app() -> AppResult<()> {
    let config =
        CollectorConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    run_app_with(config).await
}

/// Boot sequence driven by an already-loaded configuration.
///
/// # Errors
///
/// Returns an error if telemetry cannot be installed or either collaborator
/// cannot be reached at startup. Failures after startup are handled per cycle.
pub async fn run_app_with(config: CollectorConfig) -> AppResult<()> {
    let logging = logging_config(&config)?;
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let shutdown = CancellationToken::new();

    info!(
        deluge = %config.deluge.web_url,
        influxdb = %config.influx.url,
        database = %config.influx.database,
        "connecting to collaborators"
    );
    let client = DelugeWebClient::new(&config.deluge, config.http_timeout)
        .map_err(|err| AppError::rpc("deluge.client", err))?;
    client
        .connect()
        .await
        .map_err(|err| AppError::rpc("deluge.connect", err))?;

    let mut sink = InfluxSink::new(&config.influx, config.http_timeout)
        .map_err(|err| AppError::sink("influx.client", err))?;
    sink.select_database(&config.influx.database)
        .await
        .map_err(|err| AppError::sink("influx.select_database", err))?;

    let listener = spawn_shutdown_listener(shutdown.clone())?;
    record_app_mode("collecting");

    let caller = ResilientCaller::new(
        client,
        RetryPolicy::from_schedule(&config.schedule),
        metrics.clone(),
        shutdown,
    );
    let fetcher = StatsFetcher::new(caller, config.fields.clone());
    let mut collector = Collector::new(
        fetcher,
        sink,
        config.schedule.poll_interval,
        metrics.clone(),
    );
    let report = collector.run().await;

    record_app_mode("shutdown");
    listener.abort();
    info!(
        cycles = report.cycles,
        points_written = report.points_written,
        failures = report.failures,
        "torrentstat shutdown complete"
    );
    match metrics.render() {
        Ok(rendered) => debug!(metrics = %rendered, "final metrics"),
        Err(err) => warn!(error = %err, "rendering final metrics failed"),
    }
    Ok(())
}

fn logging_config(config: &CollectorConfig) -> AppResult<LoggingConfig<'static>> {
    let mut logging = LoggingConfig::default();
    if let Some(raw) = config.log_format.as_deref() {
        logging.format = LogFormat::from_str(raw).map_err(|value| AppError::InvalidConfig {
            field: "log_format",
            reason: "unknown_format",
            value: Some(value),
        })?;
    }
    Ok(logging)
}

fn spawn_shutdown_listener(shutdown: CancellationToken) -> AppResult<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|source| AppError::Signal { source })?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let received = tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        };
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await;

        match received {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => warn!(error = %err, "signal listener failed; shutting down"),
        }
        shutdown.cancel();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(log_format: Option<&str>) -> AppResult<CollectorConfig> {
        let mut vars = HashMap::from([("DELUGE_WEB_PASSWORD", "deluge".to_string())]);
        if let Some(format) = log_format {
            vars.insert("TORRENTSTAT_LOG_FORMAT", format.to_string());
        }
        CollectorConfig::from_lookup(|name| vars.get(name).cloned())
            .map_err(|err| AppError::config("config.from_lookup", err))
    }

    #[test]
    fn log_format_override_is_applied() -> AppResult<()> {
        assert_eq!(
            logging_config(&config(Some("json"))?)?.format,
            LogFormat::Json
        );
        assert_eq!(
            logging_config(&config(None)?)?.format,
            LogFormat::infer()
        );
        Ok(())
    }

    #[test]
    fn unknown_log_format_is_rejected() -> AppResult<()> {
        let err = logging_config(&config(Some("xml"))?).err();
        assert!(matches!(
            err,
            Some(AppError::InvalidConfig {
                field: "log_format",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_listener_can_be_aborted() -> AppResult<()> {
        let token = CancellationToken::new();
        let listener = spawn_shutdown_listener(token.clone())?;
        listener.abort();
        assert!(listener.await.is_err());
        assert!(!token.is_cancelled());
        Ok(())
    }
}
