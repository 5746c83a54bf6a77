//! Configuration consumed when spawning a handler.

use std::time::Duration;

use crate::{
    filter::DependencyFilter, level::Severity, payload::PayloadOptions,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
};

/// Default timeout for flush acknowledgements.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Concurrency model used for webhook delivery.
#[derive(Clone, Debug, Default)]
pub enum ConcurrencyMode {
    /// Deliver from a dedicated background thread.
    #[default]
    Threaded,
    /// Deliver from a task spawned on a Tokio runtime. When no handle
    /// is supplied the runtime ambient at build time is used.
    Cooperative {
        handle: Option<tokio::runtime::Handle>,
    },
}

/// Runtime settings shared by the handler facade and its worker.
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Minimum severity accepted for delivery.
    pub level: Severity,
    /// Logger-name denylist applied before enqueueing.
    pub filter: DependencyFilter,
    /// Formatting and alerting options applied per payload.
    pub options: PayloadOptions,
    /// Upper bound on how long `close` waits for the drain to finish.
    /// `None` waits until every queued event has been attempted.
    pub close_timeout: Option<Duration>,
    /// How long `flush` waits for the worker's acknowledgement.
    pub flush_timeout: Duration,
    /// Text of the notice posted after the final drain, if any.
    pub close_marker: Option<String>,
    /// Minimum interval between dropped-event warnings.
    pub warn_interval: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            level: Severity::Trace,
            filter: DependencyFilter::default(),
            options: PayloadOptions::default(),
            close_timeout: None,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            close_marker: None,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}
