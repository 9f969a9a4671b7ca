//! Status polling through the [`ResilientCaller`].

use serde_json::json;
use thiserror::Error;
use torrentstat_core::{FieldList, RawStatusBatch, RpcClient, RpcError, StatusDecodeError};
use tracing::debug;

use crate::caller::{ResilientCaller, RetryOutcome};

/// Daemon method returning the status of every torrent.
pub const STATUS_METHOD: &str = "core.get_torrents_status";

/// Errors that abort a single fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The daemon rejected the call with a non-retryable error.
    #[error("status query failed")]
    Rpc {
        /// Source RPC error.
        #[from]
        source: RpcError,
    },
    /// The daemon answered with an unexpected shape.
    #[error("status response could not be decoded")]
    Decode {
        /// Source decode error.
        #[from]
        source: StatusDecodeError,
    },
}

/// Polls the daemon for the configured stats of every torrent.
pub struct StatsFetcher<C> {
    caller: ResilientCaller<C>,
    fields: FieldList,
}

impl<C: RpcClient> StatsFetcher<C> {
    /// Build a fetcher requesting `fields` through `caller`.
    #[must_use]
    pub const fn new(caller: ResilientCaller<C>, fields: FieldList) -> Self {
        Self { caller, fields }
    }

    /// Stats requested on every poll.
    #[must_use]
    pub const fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Borrow the underlying caller.
    #[must_use]
    pub const fn caller(&self) -> &ResilientCaller<C> {
        &self.caller
    }

    /// Fetch the current status of every torrent.
    ///
    /// `Ok(None)` means no data this cycle: retries were exhausted or shutdown
    /// was requested.
    ///
    /// # Errors
    ///
    /// Returns an error when the daemon rejects the query or its response is malformed.
    pub async fn get_stats(&self) -> Result<Option<RawStatusBatch>, FetchError> {
        let args = [json!({}), self.fields.to_rpc_arg()];
        match self.caller.call_retry(STATUS_METHOD, &args).await? {
            RetryOutcome::Completed(value) => {
                let batch = RawStatusBatch::from_rpc_value(&value)?;
                debug!(torrents = batch.len(), "status fetched");
                Ok(Some(batch))
            }
            RetryOutcome::Exhausted { attempts } => {
                debug!(attempts, "status unavailable this cycle");
                Ok(None)
            }
            RetryOutcome::Cancelled => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::RetryPolicy;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use torrentstat_core::RpcResult;
    use torrentstat_telemetry::Metrics;

    struct Scripted {
        response: RpcResult<Value>,
        seen: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl RpcClient for Scripted {
        async fn connect(&self) -> RpcResult<()> {
            Ok(())
        }

        async fn call(&self, method: &str, args: &[Value]) -> RpcResult<Value> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((method.to_string(), args.to_vec()));
            }
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(RpcError::Remote { code, message, .. }) => Err(RpcError::Remote {
                    method: method.to_string(),
                    code: *code,
                    message: message.clone(),
                }),
                Err(_) => Err(RpcError::reconnect_failed(
                    method,
                    std::io::Error::other("daemon gone"),
                )),
            }
        }
    }

    fn fetcher(response: RpcResult<Value>) -> anyhow::Result<StatsFetcher<Scripted>> {
        let client = Scripted {
            response,
            seen: Mutex::new(Vec::new()),
        };
        let caller = ResilientCaller::new(
            client,
            RetryPolicy::new(2, Duration::from_secs(15)),
            Metrics::new()?,
            CancellationToken::new(),
        );
        let fields = FieldList::new(["ratio", "progress"])?;
        Ok(StatsFetcher::new(caller, fields))
    }

    #[tokio::test]
    async fn requests_every_torrent_with_the_field_list() -> anyhow::Result<()> {
        let fetcher = fetcher(Ok(json!({
            "abc123": { "name": "Ubuntu.iso", "ratio": 1.5, "progress": 100.0 }
        })))?;

        let batch = fetcher.get_stats().await?;

        let batch = batch.ok_or_else(|| anyhow::anyhow!("expected a batch"))?;
        assert_eq!(batch.len(), 1);
        let seen = fetcher
            .caller()
            .client()
            .seen
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .clone();
        assert_eq!(
            seen,
            vec![(
                STATUS_METHOD.to_string(),
                vec![json!({}), json!(["name", "ratio", "progress"])]
            )]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_yield_no_data() -> anyhow::Result<()> {
        let fetcher = fetcher(Err(RpcError::reconnect_failed(
            STATUS_METHOD,
            std::io::Error::other("daemon gone"),
        )))?;
        assert!(fetcher.get_stats().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn remote_errors_and_bad_shapes_are_reported() -> anyhow::Result<()> {
        let rejected = fetcher(Err(RpcError::Remote {
            method: STATUS_METHOD.to_string(),
            code: Some(2),
            message: "Unknown method".to_string(),
        }))?;
        assert!(matches!(
            rejected.get_stats().await,
            Err(FetchError::Rpc { .. })
        ));

        let malformed = fetcher(Ok(json!(["abc123"])))?;
        assert!(matches!(
            malformed.get_stats().await,
            Err(FetchError::Decode { .. })
        ));

        let empty = fetcher(Ok(Value::Null))?;
        assert_eq!(empty.get_stats().await?, Some(RawStatusBatch::new()));
        Ok(())
    }
}
