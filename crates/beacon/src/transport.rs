//! HTTP transport for sending batches.

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::types::{BatchRequest, LIBRARY_NAME, LIBRARY_VERSION};
use crate::Error;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP transport for sending batches to the ingestion API.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut builder =
            reqwest::Client::builder().user_agent(format!("{LIBRARY_NAME}/{LIBRARY_VERSION}"));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let endpoint = format!("{}/event/batch/", config.host());

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key().to_string(),
            timeout: config.timeout(),
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Send a batch, retrying transient failures.
    ///
    /// Returns the response body, or `Value::Null` when it is empty or not JSON.
    pub async fn send(&self, request: &BatchRequest<'_>) -> Result<Value, Error> {
        let body = serde_json::to_vec(request)?;
        let mut retry = 0;

        loop {
            debug!(
                endpoint = %self.endpoint,
                event_count = request.batch.len(),
                attempt = retry + 1,
                "sending batch"
            );

            let err = match self.send_once(&body).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            retry += 1;
            if !self.retry.should_retry(retry, &err) {
                return Err(err);
            }

            let delay = self.retry.delay(retry);
            warn!(
                error = %err,
                retry,
                delay_ms = delay.as_millis() as u64,
                "batch request failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn send_once(&self, body: &[u8]) -> Result<Value, Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "API request failed");
            return Err(Error::from_status(status));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        debug!(status = %status, "batch sent successfully");

        Ok(value)
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(after) if err.is_timeout() => Error::Timeout { after },
            _ => err.into(),
        }
    }
}
