//! Blocking webhook transport backed by `ureq`.

use std::time::Duration;

use ureq::{Agent, AgentBuilder};

use super::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, Transport, TransportError,
    duration_from_secs,
};
use crate::payload::WebhookPayload;

/// Blocking transport that POSTs payloads through a pooled [`ureq::Agent`].
pub struct UreqTransport {
    agent: Agent,
    url: String,
}

impl UreqTransport {
    /// Build a transport for `url` with the default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeouts(url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build a transport with explicit connect and request timeouts.
    pub fn with_timeouts(
        url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout(request_timeout)
            .build();
        Self::with_agent(agent, url)
    }

    /// Build a transport around a pre-configured agent.
    pub fn with_agent(agent: Agent, url: impl Into<String>) -> Self {
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)?;
        let request = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        match request.send_string(&body) {
            // `ureq` only returns `Err` for 400 and above, so the `Ok`
            // arm still has to separate the 2xx class from 1xx/3xx.
            Ok(response) => match response.status() {
                200..=299 => Ok(()),
                status => Err(TransportError::Status { status }),
            },
            Err(ureq::Error::Status(status, response)) => Err(classify_error(status, response)),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Network(err.to_string())),
        }
    }
}

/// Convert an error response into a transport error, extracting the
/// endpoint's `retry_after` detail for 429s.
fn classify_error(status: u16, response: ureq::Response) -> TransportError {
    if status != 429 {
        return TransportError::Status { status };
    }
    TransportError::RateLimited {
        retry_after: retry_after_hint(response),
    }
}

fn retry_after_hint(response: ureq::Response) -> Option<Duration> {
    if let Some(delay) = response
        .header("Retry-After")
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(duration_from_secs)
    {
        return Some(delay);
    }
    let body = response.into_string().ok()?;
    let value: serde_json::Value = serde_json::from_str(&body).ok()?;
    value.get("retry_after")?.as_f64().and_then(duration_from_secs)
}
