//! Compatibility bridge for the Rust `log` crate.
//!
//! [`WebhookLogBridge`] implements `log::Log` and forwards each record
//! to a [`DiscordWebhookHandler`], so ordinary `log::error!` calls end
//! up in a Discord channel. The bridge applies the handler's dependency
//! filter before converting records, which also breaks the feedback
//! loop that would otherwise form when the delivery stack logs about
//! its own failures.

use std::sync::OnceLock;

use log::{LevelFilter, Metadata, Record};

use crate::{
    handler::DiscordWebhookHandler,
    level::Severity,
    record::LogEvent,
};

/// Adapter implementing the Rust `log::Log` trait.
///
/// Record targets become logger names verbatim, so module paths such as
/// `my_app::worker` are matched against the denylist exactly as
/// written.
pub struct WebhookLogBridge {
    handler: DiscordWebhookHandler,
}

impl WebhookLogBridge {
    /// Wrap a handler for use as a `log::Log` implementation.
    pub fn new(handler: DiscordWebhookHandler) -> Self {
        Self { handler }
    }

    /// Access the wrapped handler.
    pub fn handler(&self) -> &DiscordWebhookHandler {
        &self.handler
    }
}

impl log::Log for WebhookLogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        Severity::from(metadata.level()) >= self.handler.level()
            && !self.handler.filter().is_denied(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let event = LogEvent::new(
            record.target(),
            Severity::from(record.level()),
            &record.args().to_string(),
        );
        // After close the handler already warns about drops itself.
        let _ = self.handler.handle(event);
    }

    fn flush(&self) {
        self.handler.flush();
    }
}

static INSTALL_RESULT: OnceLock<bool> = OnceLock::new();

/// Install the handler as the global Rust logger, forwarding every
/// level.
///
/// Returns `true` on success. When a different global logger is already
/// set, installation fails and `false` is returned; the handler is then
/// closed and dropped. Subsequent calls return the cached outcome.
pub fn try_install(handler: DiscordWebhookHandler) -> bool {
    install_with_level(handler, LevelFilter::Trace)
}

/// Install the handler as the global Rust logger with an explicit
/// `log::max_level` ceiling.
pub fn install_with_level(handler: DiscordWebhookHandler, max_level: LevelFilter) -> bool {
    *INSTALL_RESULT.get_or_init(|| {
        if log::set_boxed_logger(Box::new(WebhookLogBridge::new(handler))).is_err() {
            return false;
        }
        log::set_max_level(max_level);
        true
    })
}
