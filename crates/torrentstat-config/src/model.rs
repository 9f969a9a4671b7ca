//! Typed settings consumed by the collector binary.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use torrentstat_core::FieldList;
use url::Url;

/// Credential wrapper that never prints its contents.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for use on the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no secret was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Secret {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("Secret(***)")
    }
}

/// Connection details for the Deluge Web UI and the daemon behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelugeSettings {
    /// Base URL of the Web UI exposing the JSON-RPC gateway.
    pub web_url: Url,
    /// Web UI password used for `auth.login`.
    pub web_password: Secret,
    /// Daemon host the Web UI should be connected to.
    pub host: String,
    /// Daemon RPC port.
    pub port: u16,
    /// Daemon username, used when the host has to be registered.
    pub username: String,
    /// Daemon password, used when the host has to be registered.
    pub password: Secret,
}

/// Connection details for the InfluxDB sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxSettings {
    /// Base URL of the InfluxDB HTTP API.
    pub url: Url,
    /// Database receiving the points.
    pub database: String,
    /// Optional basic-auth username.
    pub username: Option<String>,
    /// Optional basic-auth password.
    pub password: Option<Secret>,
}

/// Timing knobs for the collection loop and its retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Pause between collection cycles.
    pub poll_interval: Duration,
    /// Pause between attempts after a reconnect failure.
    pub retry_backoff: Duration,
    /// Attempts per RPC call, including the first (at least one).
    pub retry_attempts: u32,
}

/// Complete collector configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Deluge connection settings.
    pub deluge: DelugeSettings,
    /// InfluxDB connection settings.
    pub influx: InfluxSettings,
    /// Stats requested on every poll.
    pub fields: FieldList,
    /// Collection cadence and retry policy.
    pub schedule: ScheduleSettings,
    /// Per-request timeout applied by both HTTP adapters.
    pub http_timeout: Duration,
    /// Requested log format (`json` or `pretty`) when set.
    pub log_format: Option<String>,
}
