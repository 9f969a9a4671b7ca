//! # Design
//!
//! - Centralize startup errors; anything raised here ends the process.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Per-cycle failures never reach this type; the collector recovers from them.

use thiserror::Error;
use torrentstat_core::{RpcError, SinkError};

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: torrentstat_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: torrentstat_telemetry::TelemetryError,
    },
    /// The torrent daemon could not be reached.
    #[error("rpc operation failed")]
    Rpc {
        /// Operation identifier.
        operation: &'static str,
        /// Source RPC error.
        source: RpcError,
    },
    /// The time-series sink could not be prepared.
    #[error("sink operation failed")]
    Sink {
        /// Operation identifier.
        operation: &'static str,
        /// Source sink error.
        source: SinkError,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
    /// Installing the shutdown signal handler failed.
    #[error("signal handler installation failed")]
    Signal {
        /// Source IO error.
        source: std::io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: torrentstat_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: torrentstat_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn rpc(operation: &'static str, source: RpcError) -> Self {
        Self::Rpc { operation, source }
    }

    pub(crate) const fn sink(operation: &'static str, source: SinkError) -> Self {
        Self::Sink { operation, source }
    }
}
