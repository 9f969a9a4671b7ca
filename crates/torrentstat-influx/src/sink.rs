//! HTTP writer for the InfluxDB 1.x API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use torrentstat_config::{InfluxSettings, Secret};
use torrentstat_core::{PointBatch, PointSink, SinkError, SinkResult};
use tracing::{debug, info};
use url::Url;

use crate::line_protocol::encode_batch;

const OPERATION_PING: &str = "ping";
const OPERATION_WRITE: &str = "write";

/// [`PointSink`] posting line protocol to `/write`.
pub struct InfluxSink {
    http: Client,
    base_url: Url,
    credentials: Option<(String, Secret)>,
    database: Option<String>,
}

impl InfluxSink {
    /// Build a sink for the server described by `settings`.
    ///
    /// The configured database is not selected yet; call
    /// [`PointSink::select_database`] before writing.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: &InfluxSettings, timeout: Duration) -> SinkResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SinkError::transport("client.build", err))?;
        let credentials = settings
            .username
            .clone()
            .zip(settings.password.clone());

        let mut base_url = settings.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            credentials,
            database: None,
        })
    }

    /// Database writes currently go to.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn endpoint(&self, operation: &'static str) -> SinkResult<Url> {
        self.base_url
            .join(operation)
            .map_err(|err| SinkError::transport(operation, err))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password.expose())),
            None => request,
        }
    }

    async fn ping(&self) -> SinkResult<()> {
        let request = self.authorize(self.http.get(self.endpoint(OPERATION_PING)?));
        let response = request
            .send()
            .await
            .map_err(|err| SinkError::transport(OPERATION_PING, err))?;
        ensure_success(OPERATION_PING, response).await
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn select_database(&mut self, name: &str) -> SinkResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SinkError::InvalidDatabase {
                value: name.to_string(),
            });
        }
        self.ping().await?;
        info!(database = trimmed, "influxdb database selected");
        self.database = Some(trimmed.to_string());
        Ok(())
    }

    async fn write(&self, batch: &PointBatch) -> SinkResult<()> {
        let database = self.database.as_deref().ok_or(SinkError::DatabaseNotSelected)?;
        let body = encode_batch(batch)?;
        if body.is_empty() {
            debug!(points = batch.len(), "nothing to write");
            return Ok(());
        }

        let mut url = self.endpoint(OPERATION_WRITE)?;
        url.query_pairs_mut()
            .append_pair("db", database)
            .append_pair("precision", "ns");

        let response = self
            .authorize(self.http.post(url))
            .body(body)
            .send()
            .await
            .map_err(|err| SinkError::transport(OPERATION_WRITE, err))?;
        ensure_success(OPERATION_WRITE, response).await?;
        debug!(points = batch.len(), database, "points written");
        Ok(())
    }
}

async fn ensure_success(operation: &'static str, response: Response) -> SinkResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Status {
        operation,
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}
