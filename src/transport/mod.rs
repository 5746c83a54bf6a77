//! Delivery transports for webhook payloads.
//!
//! A transport owns the HTTP client used to POST payloads to the webhook
//! endpoint. The delivery worker drives it strictly sequentially and
//! releases it exactly once during shutdown, so implementations may hold
//! connection state without locking.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::payload::WebhookPayload;

mod reqwest;
mod ureq;

pub use self::reqwest::ReqwestTransport;
pub use self::ureq::UreqTransport;

/// Default timeout for establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a single webhook request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced by a transport send.
///
/// The worker never retries: each error is reported once through the
/// configured reporter and delivery moves on to the next event.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint answered with a non-success status.
    #[error("webhook returned status {status}")]
    Status { status: u16 },
    /// The endpoint reported rate limiting (HTTP 429). `retry_after` is
    /// informational only.
    #[error("webhook rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    /// The request never completed (DNS, TLS, connect, or I/O failure).
    #[error("network error: {0}")]
    Network(String),
    /// The payload could not be serialised to JSON.
    #[error(transparent)]
    Serialise(#[from] serde_json::Error),
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(" (retry after {:.1}s)", delay.as_secs_f64()),
        None => String::new(),
    }
}

/// Convert a `retry_after` value in seconds into a duration, discarding
/// negative, non-finite, or unrepresentably large input. The value
/// comes straight off the wire, so it must never be able to panic the
/// delivery worker.
pub(crate) fn duration_from_secs(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value).ok()
}

/// Blocking transport driven by the threaded delivery worker.
pub trait Transport: Send {
    /// POST one payload to the webhook endpoint.
    fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError>;

    /// Release held resources. Called exactly once, after the final send.
    fn release(&mut self) {}
}

/// Asynchronous transport driven by the cooperative delivery task.
#[async_trait]
pub trait AsyncTransport: Send {
    /// POST one payload to the webhook endpoint.
    async fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError>;

    /// Release held resources. Called exactly once, after the final send.
    async fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_includes_delay_when_known() {
        let err = TransportError::RateLimited {
            retry_after: Some(Duration::from_millis(1500)),
        };
        assert_eq!(err.to_string(), "webhook rate limited (retry after 1.5s)");

        let err = TransportError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "webhook rate limited");
    }

    #[test]
    fn duration_from_secs_discards_invalid_input() {
        assert_eq!(duration_from_secs(2.5), Some(Duration::from_secs_f64(2.5)));
        assert_eq!(duration_from_secs(0.0), Some(Duration::ZERO));
        assert_eq!(duration_from_secs(-1.0), None);
        assert_eq!(duration_from_secs(f64::NAN), None);
        assert_eq!(duration_from_secs(f64::INFINITY), None);
        // Finite but far beyond what a Duration can hold.
        assert_eq!(duration_from_secs(1e300), None);
        assert_eq!(duration_from_secs(u64::MAX as f64 * 2.0), None);
    }
}
