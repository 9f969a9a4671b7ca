//! Error types shared by the collector core and its collaborators.
//!
//! # Design
//! - Keep error messages constant; carry operational context in fields.
//! - Reconnect failures are a distinct variant so retry policies can match on them.

use std::error::Error;

use thiserror::Error;

/// Errors raised by an RPC client collaborator.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The session was lost and the automatic reconnect did not succeed.
    #[error("rpc reconnect failed")]
    ReconnectFailed {
        /// Method that was in flight when the session was lost.
        method: String,
        /// Failure reported by the reconnect attempt.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The transport failed in a way that reconnecting cannot fix.
    #[error("rpc transport failed")]
    Transport {
        /// Method (or session step) that failed.
        method: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The remote side rejected the call.
    #[error("rpc call rejected by remote")]
    Remote {
        /// Method that was rejected.
        method: String,
        /// Remote error code when one was supplied.
        code: Option<i64>,
        /// Remote error message.
        message: String,
    },
    /// The supplied credentials were rejected.
    #[error("rpc authentication rejected")]
    AuthRejected,
    /// The response did not have the expected shape.
    #[error("rpc response malformed")]
    MalformedResponse {
        /// Method whose response was malformed.
        method: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The daemon host could not be selected for the session.
    #[error("daemon host unavailable")]
    HostUnavailable {
        /// Daemon host name.
        host: String,
        /// Daemon port.
        port: u16,
        /// Reason reported while selecting the host.
        reason: String,
    },
}

impl RpcError {
    /// Build a reconnect failure for `method` from any error source.
    pub fn reconnect_failed(
        method: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::ReconnectFailed {
            method: method.into(),
            source: source.into(),
        }
    }

    /// Build a transport failure for `method` from any error source.
    pub fn transport(
        method: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            method: method.into(),
            source: source.into(),
        }
    }

    /// Whether the error signals a transient disconnect worth retrying.
    #[must_use]
    pub const fn is_reconnect_failure(&self) -> bool {
        matches!(self, Self::ReconnectFailed { .. })
    }
}

/// Convenience alias for RPC results.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised by a time-series sink collaborator.
#[derive(Debug, Error)]
pub enum SinkError {
    /// `write` was invoked before a database was selected.
    #[error("no database selected")]
    DatabaseNotSelected,
    /// The requested database name was rejected.
    #[error("invalid database name")]
    InvalidDatabase {
        /// Offending database name.
        value: String,
    },
    /// The transport to the sink failed.
    #[error("sink transport failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The sink answered with a non-success status.
    #[error("sink returned error status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// Status code returned by the sink.
        status: u16,
        /// Response body, trimmed.
        body: String,
    },
    /// A point could not be encoded for the sink's wire format.
    #[error("point encoding failed")]
    Encode {
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl SinkError {
    /// Build a transport failure for `operation` from any error source.
    pub fn transport(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }
}

/// Convenience alias for sink results.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised while decoding a status response into a raw batch.
#[derive(Debug, Error)]
pub enum StatusDecodeError {
    /// The response was not a mapping of torrents.
    #[error("status response is not an object")]
    NotAnObject {
        /// JSON kind that was received instead.
        kind: &'static str,
    },
    /// A torrent entry was not a mapping of stats.
    #[error("status entry is not an object")]
    EntryNotObject {
        /// Identifier of the offending entry.
        id: String,
    },
}

/// Errors raised while building a field list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldListError {
    /// No stat names were supplied.
    #[error("field list is empty")]
    Empty,
    /// A stat name was blank.
    #[error("field name is blank")]
    BlankName {
        /// Position of the blank entry in the supplied list.
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn only_reconnect_failures_are_retryable() {
        let reconnect =
            RpcError::reconnect_failed("core.get_torrents_status", io::Error::other("x"));
        assert!(reconnect.is_reconnect_failure());
        assert!(reconnect.source().is_some());

        let transport = RpcError::transport("auth.login", io::Error::other("x"));
        assert!(!transport.is_reconnect_failure());
        assert!(!RpcError::AuthRejected.is_reconnect_failure());
        assert!(
            !RpcError::Remote {
                method: "core.nope".into(),
                code: Some(2),
                message: "Unknown method".into(),
            }
            .is_reconnect_failure()
        );
    }

    #[test]
    fn messages_stay_constant() {
        let cases: Vec<(Box<dyn Error>, &str)> = vec![
            (Box::new(RpcError::AuthRejected), "rpc authentication rejected"),
            (
                Box::new(RpcError::MalformedResponse {
                    method: "web.connected".into(),
                    reason: "missing_result",
                }),
                "rpc response malformed",
            ),
            (Box::new(SinkError::DatabaseNotSelected), "no database selected"),
            (
                Box::new(SinkError::Status {
                    operation: "write",
                    status: 400,
                    body: "unable to parse".into(),
                }),
                "sink returned error status",
            ),
            (
                Box::new(StatusDecodeError::EntryNotObject { id: "abc".into() }),
                "status entry is not an object",
            ),
            (Box::new(FieldListError::Empty), "field list is empty"),
        ];
        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
        }
    }
}
