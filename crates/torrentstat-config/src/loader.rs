//! Environment parsing for [`CollectorConfig`].
//!
//! # Design
//! - Every variable is read once at startup; nothing is reloaded at runtime.
//! - Parsing goes through an injected lookup so tests never touch the process env.
//! - Blank values count as unset.

use std::time::Duration;

use torrentstat_core::FieldList;
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{CollectorConfig, DelugeSettings, InfluxSettings, ScheduleSettings, Secret};

/// Deluge Web UI base URL.
pub const ENV_DELUGE_WEB_URL: &str = "DELUGE_WEB_URL";
/// Deluge Web UI password.
pub const ENV_DELUGE_WEB_PASSWORD: &str = "DELUGE_WEB_PASSWORD";
/// Deluge daemon host.
pub const ENV_DELUGE_HOST: &str = "DELUGE_HOST";
/// Deluge daemon port.
pub const ENV_DELUGE_PORT: &str = "DELUGE_PORT";
/// Deluge daemon username.
pub const ENV_DELUGE_USERNAME: &str = "DELUGE_USERNAME";
/// Deluge daemon password.
pub const ENV_DELUGE_PASSWORD: &str = "DELUGED_PW";
/// InfluxDB base URL.
pub const ENV_INFLUXDB_URL: &str = "INFLUXDB_URL";
/// InfluxDB database name.
pub const ENV_INFLUXDB_DATABASE: &str = "INFLUXDB_DATABASE";
/// InfluxDB basic-auth username.
pub const ENV_INFLUXDB_USERNAME: &str = "INFLUXDB_USERNAME";
/// InfluxDB basic-auth password.
pub const ENV_INFLUXDB_PASSWORD: &str = "INFLUXDB_PASSWORD";
/// Comma-separated field list override.
pub const ENV_FIELDS: &str = "TORRENTSTAT_FIELDS";
/// Seconds between collection cycles.
pub const ENV_POLL_INTERVAL_SECS: &str = "TORRENTSTAT_POLL_INTERVAL_SECS";
/// Seconds between retry attempts.
pub const ENV_RETRY_BACKOFF_SECS: &str = "TORRENTSTAT_RETRY_BACKOFF_SECS";
/// Attempts per RPC call.
pub const ENV_RETRY_ATTEMPTS: &str = "TORRENTSTAT_RETRY_ATTEMPTS";
/// Per-request HTTP timeout in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TORRENTSTAT_HTTP_TIMEOUT_SECS";
/// Log output format.
pub const ENV_LOG_FORMAT: &str = "TORRENTSTAT_LOG_FORMAT";

impl CollectorConfig {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let deluge = DelugeSettings {
            web_url: env.url(ENV_DELUGE_WEB_URL, defaults::DELUGE_WEB_URL)?,
            web_password: env
                .secret(ENV_DELUGE_WEB_PASSWORD)
                .ok_or(ConfigError::MissingEnv {
                    name: ENV_DELUGE_WEB_PASSWORD,
                })?,
            host: env
                .text(ENV_DELUGE_HOST)
                .unwrap_or_else(|| defaults::DELUGE_HOST.to_string()),
            port: env
                .text(ENV_DELUGE_PORT)
                .map_or(Ok(defaults::DELUGE_PORT), |raw| {
                    parse_port(ENV_DELUGE_PORT, &raw)
                })?,
            username: env
                .text(ENV_DELUGE_USERNAME)
                .unwrap_or_else(|| defaults::DELUGE_USERNAME.to_string()),
            password: env.secret(ENV_DELUGE_PASSWORD).unwrap_or_default(),
        };

        let influx = InfluxSettings {
            url: env.url(ENV_INFLUXDB_URL, defaults::INFLUXDB_URL)?,
            database: env
                .text(ENV_INFLUXDB_DATABASE)
                .unwrap_or_else(|| defaults::INFLUXDB_DATABASE.to_string()),
            username: env.text(ENV_INFLUXDB_USERNAME),
            password: env.secret(ENV_INFLUXDB_PASSWORD),
        };
        if influx.username.is_some() != influx.password.is_some() {
            let name = if influx.username.is_some() {
                ENV_INFLUXDB_PASSWORD
            } else {
                ENV_INFLUXDB_USERNAME
            };
            return Err(ConfigError::InvalidValue {
                name,
                reason: "basic_auth_incomplete",
                value: None,
            });
        }

        let fields = env
            .text(ENV_FIELDS)
            .map_or_else(|| Ok(FieldList::default()), |raw| parse_fields(&raw))?;

        let schedule = ScheduleSettings {
            poll_interval: env.seconds(ENV_POLL_INTERVAL_SECS, defaults::POLL_INTERVAL)?,
            retry_backoff: env.seconds(ENV_RETRY_BACKOFF_SECS, defaults::RETRY_BACKOFF)?,
            retry_attempts: env
                .text(ENV_RETRY_ATTEMPTS)
                .map_or(Ok(defaults::RETRY_ATTEMPTS), |raw| parse_attempts(&raw))?,
        };
        let http_timeout = env.seconds(ENV_HTTP_TIMEOUT_SECS, defaults::HTTP_TIMEOUT)?;
        if http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: ENV_HTTP_TIMEOUT_SECS,
                reason: "zero",
                value: Some("0".to_string()),
            });
        }

        Ok(Self {
            deluge,
            influx,
            fields,
            schedule,
            http_timeout,
            log_format: env.text(ENV_LOG_FORMAT),
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn secret(&self, name: &str) -> Option<Secret> {
        (self.lookup)(name)
            .filter(|value| !value.is_empty())
            .map(Secret::new)
    }

    fn url(&self, name: &'static str, default: &str) -> ConfigResult<Url> {
        let raw = self.text(name).unwrap_or_else(|| default.to_string());
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
            name,
            value: raw,
            source,
        })
    }

    fn seconds(&self, name: &'static str, default: Duration) -> ConfigResult<Duration> {
        let Some(raw) = self.text(name) else {
            return Ok(default);
        };
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue {
                name,
                reason: "not_a_number",
                value: Some(raw),
            })
    }
}

fn parse_port(name: &'static str, raw: &str) -> ConfigResult<u16> {
    match raw.parse::<u16>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name,
            reason: "zero",
            value: Some(raw.to_string()),
        }),
        Ok(port) => Ok(port),
        Err(_) => Err(ConfigError::InvalidValue {
            name,
            reason: "out_of_range",
            value: Some(raw.to_string()),
        }),
    }
}

fn parse_attempts(raw: &str) -> ConfigResult<u32> {
    match raw.parse::<u32>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name: ENV_RETRY_ATTEMPTS,
            reason: "zero",
            value: Some(raw.to_string()),
        }),
        Ok(attempts) => Ok(attempts),
        Err(_) => Err(ConfigError::InvalidValue {
            name: ENV_RETRY_ATTEMPTS,
            reason: "not_a_number",
            value: Some(raw.to_string()),
        }),
    }
}

fn parse_fields(raw: &str) -> ConfigResult<FieldList> {
    let names = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty());
    FieldList::new(names).map_err(|source| ConfigError::InvalidFieldList { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use torrentstat_core::FieldListError;

    fn load(vars: &[(&str, &str)]) -> ConfigResult<CollectorConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        CollectorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn port_parsing_rejects_zero_and_overflow() {
        assert_eq!(parse_port(ENV_DELUGE_PORT, "58846").ok(), Some(58846));
        assert!(matches!(
            parse_port(ENV_DELUGE_PORT, "0"),
            Err(ConfigError::InvalidValue { reason: "zero", .. })
        ));
        assert!(matches!(
            parse_port(ENV_DELUGE_PORT, "70000"),
            Err(ConfigError::InvalidValue {
                reason: "out_of_range",
                ..
            })
        ));
    }

    #[test]
    fn field_override_skips_blank_entries() -> ConfigResult<()> {
        let fields = parse_fields("ratio, ,state,")?;
        assert_eq!(fields.names(), ["name", "ratio", "state"]);
        assert!(matches!(
            parse_fields(" , "),
            Err(ConfigError::InvalidFieldList {
                source: FieldListError::Empty
            })
        ));
        Ok(())
    }

    #[test]
    fn missing_web_password_is_reported() {
        let err = load(&[]).err();
        assert!(matches!(
            err,
            Some(ConfigError::MissingEnv {
                name: ENV_DELUGE_WEB_PASSWORD
            })
        ));
    }

    #[test]
    fn incomplete_basic_auth_is_rejected() {
        let err = load(&[
            (ENV_DELUGE_WEB_PASSWORD, "deluge"),
            (ENV_INFLUXDB_USERNAME, "writer"),
        ])
        .err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidValue {
                name: ENV_INFLUXDB_PASSWORD,
                reason: "basic_auth_incomplete",
                ..
            })
        ));
    }

    #[test]
    fn zero_attempts_and_timeout_are_rejected() {
        assert!(matches!(
            load(&[
                (ENV_DELUGE_WEB_PASSWORD, "deluge"),
                (ENV_RETRY_ATTEMPTS, "0")
            ]),
            Err(ConfigError::InvalidValue { reason: "zero", .. })
        ));
        assert!(matches!(
            load(&[
                (ENV_DELUGE_WEB_PASSWORD, "deluge"),
                (ENV_HTTP_TIMEOUT_SECS, "0")
            ]),
            Err(ConfigError::InvalidValue {
                name: ENV_HTTP_TIMEOUT_SECS,
                ..
            })
        ));
        assert!(matches!(
            load(&[
                (ENV_DELUGE_WEB_PASSWORD, "deluge"),
                (ENV_POLL_INTERVAL_SECS, "soon")
            ]),
            Err(ConfigError::InvalidValue {
                reason: "not_a_number",
                ..
            })
        ));
    }
}
