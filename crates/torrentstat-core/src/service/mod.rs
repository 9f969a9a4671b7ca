//! Collaborator traits implemented by the RPC and sink adapters.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{RpcResult, SinkResult};
use crate::model::PointBatch;

/// Session with a torrent daemon that can execute named RPC methods.
///
/// Implementations reconnect on their own when a session drops; when that
/// reconnect fails they report [`RpcError::ReconnectFailed`](crate::RpcError::ReconnectFailed)
/// so callers can decide whether to retry.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Establish the session. Failures here are not retried by the collector.
    async fn connect(&self) -> RpcResult<()>;

    /// Invoke `method` with positional `args` and return the decoded result.
    async fn call(&self, method: &str, args: &[Value]) -> RpcResult<Value>;
}

/// Time-series store accepting batches of points.
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Select the database subsequent writes go to. Called once at startup.
    async fn select_database(&mut self, name: &str) -> SinkResult<()>;

    /// Write every point of `batch`.
    async fn write(&self, batch: &PointBatch) -> SinkResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RpcError, SinkError};
    use serde_json::json;
    use std::sync::Mutex;

    struct EchoClient;

    #[async_trait]
    impl RpcClient for EchoClient {
        async fn connect(&self) -> RpcResult<()> {
            Ok(())
        }

        async fn call(&self, method: &str, args: &[Value]) -> RpcResult<Value> {
            if method == "daemon.fail" {
                return Err(RpcError::AuthRejected);
            }
            Ok(json!({ "method": method, "args": args }))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        database: Option<String>,
        written: Mutex<usize>,
    }

    #[async_trait]
    impl PointSink for CountingSink {
        async fn select_database(&mut self, name: &str) -> SinkResult<()> {
            self.database = Some(name.to_string());
            Ok(())
        }

        async fn write(&self, batch: &PointBatch) -> SinkResult<()> {
            if self.database.is_none() {
                return Err(SinkError::DatabaseNotSelected);
            }
            if let Ok(mut written) = self.written.lock() {
                *written += batch.len();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn traits_are_object_safe() -> anyhow::Result<()> {
        let client: Box<dyn RpcClient> = Box::new(EchoClient);
        client.connect().await?;
        let echoed = client.call("core.ping", &[json!({})]).await?;
        assert_eq!(echoed["method"], "core.ping");
        assert!(client.call("daemon.fail", &[]).await.is_err());

        let mut sink: Box<dyn PointSink> = Box::new(CountingSink::default());
        assert!(sink.write(&PointBatch::new()).await.is_err());
        sink.select_database("deluge").await?;
        sink.write(&PointBatch::new()).await?;
        Ok(())
    }
}
