//! Deluge Web UI session implementing [`RpcClient`].
//!
//! # Design
//! - All calls go through the Web UI `/json` gateway; the session lives in a cookie.
//! - A lost session triggers one reconnect and a replay of the call. A session
//!   is lost on a transport failure, on "not authenticated", or when a daemon
//!   method fails while `web.connected` reports the daemon detached.
//! - A failed reconnect surfaces as [`RpcError::ReconnectFailed`]; retrying is the
//!   caller's decision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use torrentstat_config::{DelugeSettings, Secret};
use torrentstat_core::{RpcClient, RpcError, RpcResult};
use tracing::{debug, info, warn};
use url::Url;

use crate::envelope::{CODE_NOT_AUTHENTICATED, RpcRequest, RpcResponse};

const METHOD_LOGIN: &str = "auth.login";
const METHOD_CONNECTED: &str = "web.connected";
const METHOD_GET_HOSTS: &str = "web.get_hosts";
const METHOD_ADD_HOST: &str = "web.add_host";
const METHOD_CONNECT: &str = "web.connect";

/// JSON-RPC client for the Deluge Web UI.
pub struct DelugeWebClient {
    http: Client,
    endpoint: Url,
    web_password: Secret,
    host: String,
    port: u16,
    username: String,
    password: Secret,
    auto_reconnect: bool,
    next_id: AtomicU64,
    session: Mutex<()>,
}

impl DelugeWebClient {
    /// Build a client for the Web UI described by `settings`.
    ///
    /// No request is sent until [`RpcClient::connect`] or [`RpcClient::call`] runs.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built or the gateway URL
    /// cannot be derived from the configured base URL.
    pub fn new(settings: &DelugeSettings, timeout: Duration) -> RpcResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| RpcError::transport("client.build", err))?;
        let endpoint = gateway_url(&settings.web_url)?;

        Ok(Self {
            http,
            endpoint,
            web_password: settings.web_password.clone(),
            host: settings.host.clone(),
            port: settings.port,
            username: settings.username.clone(),
            password: settings.password.clone(),
            auto_reconnect: true,
            next_id: AtomicU64::new(0),
            session: Mutex::new(()),
        })
    }

    /// Enable or disable the automatic reconnect on a lost session.
    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Gateway URL requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let request = RpcRequest { method, params, id };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| RpcError::transport(method, err))?;
        let response = response
            .error_for_status()
            .map_err(|err| RpcError::transport(method, err))?;
        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|_| RpcError::MalformedResponse {
                method: method.to_string(),
                reason: "invalid_json",
            })?;

        if let Some(fault) = envelope.error {
            return Err(RpcError::Remote {
                method: method.to_string(),
                code: fault.code,
                message: fault.message,
            });
        }
        Ok(envelope.result)
    }

    async fn find_host(&self) -> RpcResult<Option<String>> {
        let hosts = self.send(METHOD_GET_HOSTS, &[]).await?;
        let Value::Array(hosts) = hosts else {
            return Err(RpcError::MalformedResponse {
                method: METHOD_GET_HOSTS.to_string(),
                reason: "hosts_not_array",
            });
        };

        let port = u64::from(self.port);
        let found = hosts.iter().find_map(|entry| {
            let id = entry.get(0)?.as_str()?;
            let host = entry.get(1)?.as_str()?;
            let entry_port = entry.get(2)?.as_u64()?;
            (host == self.host && entry_port == port).then(|| id.to_string())
        });
        Ok(found)
    }

    async fn add_host(&self) -> RpcResult<String> {
        let params = [
            json!(self.host),
            json!(self.port),
            json!(self.username),
            json!(self.password.expose()),
        ];
        let added = self.send(METHOD_ADD_HOST, &params).await?;
        match added {
            Value::String(id) => Ok(id),
            Value::Array(parts) => match (parts.first(), parts.get(1)) {
                (Some(Value::Bool(true)), Some(Value::String(id))) => Ok(id.clone()),
                (Some(Value::Bool(false)), reason) => Err(RpcError::HostUnavailable {
                    host: self.host.clone(),
                    port: self.port,
                    reason: reason
                        .and_then(Value::as_str)
                        .unwrap_or("host rejected")
                        .to_string(),
                }),
                _ => Err(malformed_add_host()),
            },
            _ => Err(malformed_add_host()),
        }
    }

    async fn establish(&self) -> RpcResult<()> {
        let authenticated = self
            .send(METHOD_LOGIN, &[json!(self.web_password.expose())])
            .await?;
        if authenticated.as_bool() != Some(true) {
            return Err(RpcError::AuthRejected);
        }

        if self.send(METHOD_CONNECTED, &[]).await?.as_bool() == Some(true) {
            debug!("deluge web ui already attached to a daemon");
            return Ok(());
        }

        let host_id = match self.find_host().await? {
            Some(id) => id,
            None => {
                info!(host = %self.host, port = self.port, "registering deluge daemon host");
                self.add_host().await?
            }
        };
        self.send(METHOD_CONNECT, &[json!(host_id)]).await?;
        info!(host = %self.host, port = self.port, "connected to deluge daemon");
        Ok(())
    }

    /// Whether `err` means the Web UI no longer holds a usable daemon session.
    ///
    /// A daemon that drops behind a live Web UI makes daemon methods fail with
    /// ordinary remote errors, so those are confirmed through `web.connected`.
    async fn session_lost(&self, method: &str, err: &RpcError) -> bool {
        if lost_session_error(err) {
            return true;
        }
        if !is_daemon_method(method) || !matches!(err, RpcError::Remote { .. }) {
            return false;
        }
        match self.send(METHOD_CONNECTED, &[]).await {
            Ok(connected) => connected.as_bool() == Some(false),
            Err(check) => lost_session_error(&check),
        }
    }
}

#[async_trait]
impl RpcClient for DelugeWebClient {
    async fn connect(&self) -> RpcResult<()> {
        let _session = self.session.lock().await;
        self.establish().await
    }

    async fn call(&self, method: &str, args: &[Value]) -> RpcResult<Value> {
        let err = match self.send(method, args).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !self.auto_reconnect || !self.session_lost(method, &err).await {
            return Err(err);
        }

        warn!(method, error = %err, "deluge session lost; reconnecting");
        let session = self.session.lock().await;
        let reconnected = self.establish().await;
        drop(session);
        if let Err(reconnect) = reconnected {
            warn!(method, error = %reconnect, "deluge reconnect failed");
            return Err(RpcError::reconnect_failed(method, reconnect));
        }

        match self.send(method, args).await {
            Err(err) if self.session_lost(method, &err).await => {
                Err(RpcError::reconnect_failed(method, err))
            }
            other => other,
        }
    }
}

const fn lost_session_error(err: &RpcError) -> bool {
    matches!(
        err,
        RpcError::Transport { .. }
            | RpcError::Remote {
                code: Some(CODE_NOT_AUTHENTICATED),
                ..
            }
    )
}

fn is_daemon_method(method: &str) -> bool {
    !method.starts_with("web.") && !method.starts_with("auth.")
}

fn malformed_add_host() -> RpcError {
    RpcError::MalformedResponse {
        method: METHOD_ADD_HOST.to_string(),
        reason: "unexpected_add_host_result",
    }
}

fn gateway_url(base: &Url) -> RpcResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("json")
        .map_err(|err| RpcError::transport("client.build", err))
}
