//! Builder for [`DiscordWebhookHandler`].
//!
//! Exposes the webhook destination, severity gate, denylist, embed
//! formatting, alerting, close behaviour, and the concurrency mode the
//! delivery worker runs under. Custom transports may replace the
//! built-in HTTP clients for testing or relaying.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    filter::DependencyFilter,
    formatter::{EventFormatter, SharedFormatter},
    level::Severity,
    payload::PayloadOptions,
    reporter::{DeliveryReporter, LogReporter},
    transport::{AsyncTransport, ReqwestTransport, Transport, TransportError, UreqTransport},
};

use super::{
    DiscordWebhookHandler,
    config::{ConcurrencyMode, DEFAULT_FLUSH_TIMEOUT, HandlerConfig},
};

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// The HTTP client could not be initialised.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Cooperative mode was requested but no Tokio runtime is running
    /// and no handle was supplied.
    #[error("cooperative mode requires a Tokio runtime handle or an ambient runtime")]
    MissingRuntime,
}

macro_rules! ensure_nonzero {
    ($value:expr, $field:expr) => {{
        if $value.is_zero() {
            Err(HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok(())
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`DiscordWebhookHandler`] instances.
#[derive(Default)]
pub struct DiscordWebhookBuilder {
    url: Option<String>,
    transport: Option<Box<dyn Transport>>,
    async_transport: Option<Box<dyn AsyncTransport>>,
    level: Option<Severity>,
    filter: Option<DependencyFilter>,
    formatter: Option<SharedFormatter>,
    alert_text: Option<String>,
    alert_threshold: Option<Severity>,
    mode: ConcurrencyMode,
    close_timeout: Option<Duration>,
    flush_timeout: Option<Duration>,
    close_marker: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    reporter: Option<Arc<dyn DeliveryReporter>>,
}

impl DiscordWebhookBuilder {
    /// Create a new builder with no destination configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the webhook URL to POST payloads to (required unless a
    /// transport is supplied).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Replace the built-in blocking HTTP client. Implies threaded
    /// delivery.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Replace the built-in asynchronous HTTP client. Only valid with
    /// cooperative delivery.
    pub fn with_async_transport(mut self, transport: impl AsyncTransport + 'static) -> Self {
        self.async_transport = Some(Box::new(transport));
        self
    }

    /// Set the formatter used for embed descriptions.
    pub fn with_formatter(mut self, formatter: impl EventFormatter + 'static) -> Self {
        self.formatter = Some(SharedFormatter::new(formatter));
        self
    }

    /// Replace the default dependency denylist.
    pub fn with_denylist<P, S>(mut self, prefixes: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(DependencyFilter::new(prefixes));
        self
    }

    /// Replace the logger-name filter wholesale.
    pub fn with_filter(mut self, filter: DependencyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the message content attached to alerting severities.
    pub fn with_alert_text(mut self, text: impl Into<String>) -> Self {
        self.alert_text = Some(text.into());
        self
    }

    /// Post a final notice with the given text once the handler closes.
    pub fn with_close_marker(mut self, text: impl Into<String>) -> Self {
        self.close_marker = Some(text.into());
        self
    }

    /// Select the delivery mode directly. [`threaded`](Self::threaded),
    /// [`cooperative`](Self::cooperative), and
    /// [`with_runtime`](Self::with_runtime) are shorthands for the
    /// common cases.
    pub fn with_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Deliver from a dedicated background thread (the default).
    pub fn threaded(mut self) -> Self {
        self.mode = ConcurrencyMode::Threaded;
        self
    }

    /// Deliver from a task on the runtime ambient when `build` is
    /// called.
    pub fn cooperative(mut self) -> Self {
        self.mode = ConcurrencyMode::Cooperative { handle: None };
        self
    }

    /// Deliver from a task on the given runtime.
    pub fn with_runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.mode = ConcurrencyMode::Cooperative {
            handle: Some(handle),
        };
        self
    }

    /// Escalate delivery failures to the given reporter instead of the
    /// logging fallback.
    pub fn with_reporter(mut self, reporter: impl DeliveryReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    option_setter!(
        #[doc = "Set the minimum severity delivered to the webhook."]
        with_level,
        level,
        Severity
    );
    option_setter!(
        #[doc = "Set the severity at or above which alert text is attached."]
        with_alert_threshold,
        alert_threshold,
        Severity
    );
    option_setter!(
        #[doc = "Bound how long `close` waits for the final drain."]
        with_close_timeout,
        close_timeout,
        Duration
    );
    option_setter!(
        #[doc = "Set how long `flush` waits for acknowledgement."]
        with_flush_timeout,
        flush_timeout,
        Duration
    );
    option_setter!(
        #[doc = "Set the TCP connect timeout for the built-in clients."]
        with_connect_timeout,
        connect_timeout,
        Duration
    );
    option_setter!(
        #[doc = "Set the per-request timeout for the built-in clients."]
        with_request_timeout,
        request_timeout,
        Duration
    );

    fn validate(&self) -> Result<(), HandlerBuildError> {
        self.validate_destination()?;
        self.validate_mode()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_destination(&self) -> Result<(), HandlerBuildError> {
        let configured = [
            self.url.is_some(),
            self.transport.is_some(),
            self.async_transport.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        match configured {
            0 => Err(HandlerBuildError::InvalidConfig(
                "a webhook URL or a transport is required".into(),
            )),
            1 => match &self.url {
                Some(url) if url.trim().is_empty() => Err(HandlerBuildError::InvalidConfig(
                    "webhook URL must not be empty".into(),
                )),
                _ => Ok(()),
            },
            _ => Err(HandlerBuildError::InvalidConfig(
                "configure either a webhook URL or a transport, not both".into(),
            )),
        }
    }

    fn validate_mode(&self) -> Result<(), HandlerBuildError> {
        match self.mode {
            ConcurrencyMode::Threaded if self.async_transport.is_some() => {
                Err(HandlerBuildError::InvalidConfig(
                    "threaded delivery requires a blocking transport".into(),
                ))
            }
            ConcurrencyMode::Cooperative { .. } if self.transport.is_some() => {
                Err(HandlerBuildError::InvalidConfig(
                    "cooperative delivery requires an asynchronous transport".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn validate_timeouts(&self) -> Result<(), HandlerBuildError> {
        if let Some(timeout) = self.connect_timeout {
            ensure_nonzero!(timeout, "connect_timeout")?;
        }
        if let Some(timeout) = self.request_timeout {
            ensure_nonzero!(timeout, "request_timeout")?;
        }
        if let Some(timeout) = self.flush_timeout {
            ensure_nonzero!(timeout, "flush_timeout")?;
        }
        Ok(())
    }

    fn build_config(&mut self) -> HandlerConfig {
        let defaults = HandlerConfig::default();
        HandlerConfig {
            level: self.level.unwrap_or(defaults.level),
            filter: self.filter.take().unwrap_or(defaults.filter),
            options: PayloadOptions {
                formatter: self.formatter.take(),
                alert_text: self.alert_text.take(),
                alert_threshold: self
                    .alert_threshold
                    .unwrap_or(defaults.options.alert_threshold),
            },
            close_timeout: self.close_timeout,
            flush_timeout: self.flush_timeout.unwrap_or(DEFAULT_FLUSH_TIMEOUT),
            close_marker: self.close_marker.take(),
            warn_interval: defaults.warn_interval,
        }
    }

    /// Validate the configuration and start the handler. The delivery
    /// worker is live once this returns.
    pub fn build(mut self) -> Result<DiscordWebhookHandler, HandlerBuildError> {
        self.validate()?;
        let config = self.build_config();
        let reporter = self
            .reporter
            .take()
            .unwrap_or_else(|| Arc::new(LogReporter));
        let connect = self.connect_timeout;
        let request = self.request_timeout;
        match std::mem::take(&mut self.mode) {
            ConcurrencyMode::Threaded => {
                let transport: Box<dyn Transport> = match self.transport.take() {
                    Some(transport) => transport,
                    None => Box::new(blocking_client(&self.url, connect, request)),
                };
                Ok(DiscordWebhookHandler::spawn_threaded(
                    config, transport, reporter,
                ))
            }
            ConcurrencyMode::Cooperative { handle } => {
                let handle = match handle {
                    Some(handle) => handle,
                    None => tokio::runtime::Handle::try_current()
                        .map_err(|_| HandlerBuildError::MissingRuntime)?,
                };
                let transport: Box<dyn AsyncTransport> = match self.async_transport.take() {
                    Some(transport) => transport,
                    None => Box::new(async_client(&self.url, connect, request)?),
                };
                Ok(DiscordWebhookHandler::spawn_cooperative(
                    config, transport, reporter, &handle,
                ))
            }
        }
    }
}

impl std::fmt::Debug for DiscordWebhookBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhookBuilder")
            .field("url", &self.url)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_async_transport", &self.async_transport.is_some())
            .field("level", &self.level)
            .field("mode", &self.mode)
            .field("close_timeout", &self.close_timeout)
            .field("close_marker", &self.close_marker)
            .finish_non_exhaustive()
    }
}

fn blocking_client(
    url: &Option<String>,
    connect: Option<Duration>,
    request: Option<Duration>,
) -> UreqTransport {
    let url = url.as_deref().unwrap_or_default();
    UreqTransport::with_timeouts(
        url,
        connect.unwrap_or(crate::transport::DEFAULT_CONNECT_TIMEOUT),
        request.unwrap_or(crate::transport::DEFAULT_REQUEST_TIMEOUT),
    )
}

fn async_client(
    url: &Option<String>,
    connect: Option<Duration>,
    request: Option<Duration>,
) -> Result<ReqwestTransport, TransportError> {
    let url = url.as_deref().unwrap_or_default();
    ReqwestTransport::with_timeouts(
        url,
        connect.unwrap_or(crate::transport::DEFAULT_CONNECT_TIMEOUT),
        request.unwrap_or(crate::transport::DEFAULT_REQUEST_TIMEOUT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_destination() {
        let err = DiscordWebhookBuilder::new()
            .build()
            .expect_err("no destination should fail validation");
        assert!(matches!(err, HandlerBuildError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_blank_url() {
        let err = DiscordWebhookBuilder::new()
            .with_url("   ")
            .build()
            .expect_err("blank URL should fail validation");
        assert!(matches!(err, HandlerBuildError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_request_timeout() {
        let err = DiscordWebhookBuilder::new()
            .with_url("https://discord.test/api/webhooks/1/token")
            .with_request_timeout(Duration::ZERO)
            .build()
            .expect_err("zero timeout should fail validation");
        assert!(matches!(err, HandlerBuildError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_async_transport_in_threaded_mode() {
        struct NoopAsync;

        #[async_trait::async_trait]
        impl crate::transport::AsyncTransport for NoopAsync {
            async fn send(
                &mut self,
                _payload: &crate::payload::WebhookPayload,
            ) -> Result<(), TransportError> {
                Ok(())
            }
        }

        let err = DiscordWebhookBuilder::new()
            .with_async_transport(NoopAsync)
            .threaded()
            .build()
            .expect_err("mode mismatch should fail validation");
        assert!(matches!(err, HandlerBuildError::InvalidConfig(_)));
    }

    #[test]
    fn cooperative_without_runtime_is_rejected() {
        let err = DiscordWebhookBuilder::new()
            .with_url("https://discord.test/api/webhooks/1/token")
            .cooperative()
            .build()
            .expect_err("no ambient runtime outside tokio");
        assert!(matches!(err, HandlerBuildError::MissingRuntime));
    }

    #[test]
    fn with_mode_selects_the_delivery_model() {
        let err = DiscordWebhookBuilder::new()
            .with_url("https://discord.test/api/webhooks/1/token")
            .with_mode(ConcurrencyMode::Cooperative { handle: None })
            .build()
            .expect_err("no ambient runtime outside tokio");
        assert!(matches!(err, HandlerBuildError::MissingRuntime));
    }
}
