//! Fallback values applied when an environment variable is unset.
//!
//! # Design
//! - Mirror the stock Deluge and InfluxDB ports so a local install works untouched.
//! - Keep timing defaults explicit; the collector never derives them.

use std::time::Duration;

/// Deluge Web UI base URL.
pub const DELUGE_WEB_URL: &str = "http://localhost:8112";
/// Deluge daemon host.
pub const DELUGE_HOST: &str = "localhost";
/// Deluge daemon RPC port.
pub const DELUGE_PORT: u16 = 58846;
/// Deluge daemon username.
pub const DELUGE_USERNAME: &str = "user";
/// InfluxDB base URL.
pub const INFLUXDB_URL: &str = "http://localhost:8086";
/// InfluxDB database receiving the points.
pub const INFLUXDB_DATABASE: &str = "deluge";
/// Pause between collection cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Pause between attempts after a reconnect failure.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(15);
/// Attempts per RPC call, including the first.
pub const RETRY_ATTEMPTS: u32 = 10;
/// Per-request timeout applied by both HTTP adapters.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
