//! Asynchronous webhook transport backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{CONTENT_TYPE, RETRY_AFTER},
};

use super::{
    AsyncTransport, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, TransportError,
    duration_from_secs,
};
use crate::payload::WebhookPayload;

/// Asynchronous transport that POSTs payloads through a [`reqwest::Client`].
pub struct ReqwestTransport {
    client: Client,
    url: String,
}

impl ReqwestTransport {
    /// Build a transport for `url` with the default timeouts.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeouts(url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build a transport for `url` with explicit timeouts.
    pub fn with_timeouts(
        url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    /// Build a transport around a pre-configured client.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AsyncTransport for ReqwestTransport {
    async fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)?;
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited {
                retry_after: retry_after_hint(response).await,
            });
        }
        Err(TransportError::Status {
            status: status.as_u16(),
        })
    }
}

/// Extract the endpoint's `retry_after` detail from a 429 response.
async fn retry_after_hint(response: reqwest::Response) -> Option<Duration> {
    if let Some(delay) = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(duration_from_secs)
    {
        return Some(delay);
    }
    let value: serde_json::Value = response.json().await.ok()?;
    value.get("retry_after")?.as_f64().and_then(duration_from_secs)
}
