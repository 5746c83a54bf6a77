//! Formatter trait and default implementation.
//!
//! Provides the [`EventFormatter`] trait alongside a helper for dynamically
//! dispatched trait objects. Configuring a formatter on the builder is what
//! switches the embed description from the raw message to formatted text.

use std::{fmt, sync::Arc};

use crate::record::LogEvent;

/// Trait for formatting log events into strings.
///
/// Implementors must be thread-safe (`Send + Sync`) so formatters can be
/// shared with the delivery worker.
pub trait EventFormatter: Send + Sync {
    /// Format a log event into a string representation.
    fn format(&self, event: &LogEvent) -> String;
}

/// Shared formatter trait object handed to the delivery worker.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn EventFormatter + Send + Sync>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: EventFormatter + Send + Sync + 'static,
    {
        let inner: Arc<dyn EventFormatter + Send + Sync> = Arc::from(formatter);
        Self { inner }
    }

    /// Format a log event using the wrapped formatter instance.
    pub fn format(&self, event: &LogEvent) -> String {
        self.inner.format(event)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn EventFormatter>)")
    }
}

/// Formats events as `logger [LEVEL] message`.
#[derive(Copy, Clone, Debug)]
pub struct DefaultFormatter;

impl EventFormatter for DefaultFormatter {
    fn format(&self, event: &LogEvent) -> String {
        format!("{} [{}] {}", event.logger, event.level, event.message)
    }
}

impl EventFormatter for Arc<dyn EventFormatter + Send + Sync> {
    fn format(&self, event: &LogEvent) -> String {
        (**self).format(event)
    }
}

impl EventFormatter for Box<dyn EventFormatter + Send + Sync> {
    fn format(&self, event: &LogEvent) -> String {
        (**self).format(event)
    }
}
