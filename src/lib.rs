//! Non-blocking Discord webhook sink for application logs.
//!
//! Log events are accepted from any thread, queued without bounds, and
//! posted to a Discord webhook as embeds by a single background worker,
//! so producers never wait on the network and messages arrive in the
//! order they were logged. The worker runs on a dedicated thread by
//! default or cooperatively on a Tokio runtime; either way, closing the
//! handler drains the queue before the HTTP client is released.
//!
//! ```no_run
//! use dislog::{DiscordWebhookHandler, LogEvent, Severity};
//!
//! # fn main() -> Result<(), dislog::HandlerBuildError> {
//! let mut handler = DiscordWebhookHandler::builder()
//!     .with_url("https://discord.com/api/webhooks/123/token")
//!     .with_level(Severity::Warn)
//!     .with_alert_text("@here")
//!     .build()?;
//!
//! let _ = handler.handle(LogEvent::new("app.worker", Severity::Error, "job failed"));
//! handler.close();
//! # Ok(())
//! # }
//! ```
//!
//! Events from the delivery stack's own loggers (`ureq`, `reqwest`,
//! `tokio` and friends) are dropped by a configurable denylist so the
//! sink cannot amplify its own traffic.

mod bridge;
mod filter;
mod formatter;
mod handler;
mod level;
mod payload;
mod rate_limited_warner;
mod record;
mod reporter;
mod transport;

pub use bridge::{WebhookLogBridge, install_with_level, try_install};
pub use filter::{DEFAULT_DENYLIST, DependencyFilter};
pub use formatter::{DefaultFormatter, EventFormatter, SharedFormatter};
pub use handler::{
    ConcurrencyMode, DEFAULT_FLUSH_TIMEOUT, DiscordWebhookBuilder, DiscordWebhookHandler,
    HandlerBuildError, HandlerConfig, HandlerError, WorkerState,
};
pub use level::Severity;
pub use payload::{Embed, EmbedFooter, PayloadOptions, WebhookPayload, build_payload, marker_payload};
pub use rate_limited_warner::RateLimitedWarner;
pub use record::{EventMetadata, LogEvent};
pub use reporter::{DeliveryFailure, DeliveryReporter, LogReporter};
pub use transport::{
    AsyncTransport, ReqwestTransport, Transport, TransportError, UreqTransport,
};
