//! Error types for configuration loading.

use thiserror::Error;
use torrentstat_core::FieldListError;

/// Primary error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was missing or blank.
    #[error("missing environment configuration")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// An environment variable held an invalid value.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when it is safe to report.
        value: Option<String>,
    },
    /// An environment variable held an unparsable URL.
    #[error("invalid configuration url")]
    InvalidUrl {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// The field list override was rejected.
    #[error("invalid field list")]
    InvalidFieldList {
        /// Underlying field list error.
        source: FieldListError,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
