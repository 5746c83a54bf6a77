//! Webhook payload construction.
//!
//! Everything here is pure: an event plus options in, a serialisable
//! payload out. The builder is total, so the worker can feed it any event
//! without a fallible step between dequeue and send. Oversized fields are
//! clipped to Discord's documented limits rather than left for the remote
//! end to reject.

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{formatter::SharedFormatter, level::Severity, record::LogEvent};

/// Discord's embed title length limit, in characters.
pub const MAX_TITLE_LEN: usize = 256;
/// Discord's embed description length limit, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 4096;
/// Discord's message content length limit, in characters.
pub const MAX_CONTENT_LEN: usize = 2000;

const COLOUR_ERROR: u32 = 0xFF_0000;
const COLOUR_WARN: u32 = 0xFF_FF00;
const COLOUR_DEBUG: u32 = 0x5A_0D36;
const COLOUR_DEFAULT: u32 = 0xFF_FFFF;

/// Footer block of a webhook embed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// A single embed within a webhook payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub description: String,
    pub timestamp: String,
    pub footer: EmbedFooter,
}

/// The JSON body POSTed to the webhook endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    /// Plain message text shown above the embeds; used for alerts and the
    /// close notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

/// Options governing payload construction.
#[derive(Clone, Debug)]
pub struct PayloadOptions {
    /// Formatter for the embed description; `None` sends the raw message.
    pub formatter: Option<SharedFormatter>,
    /// Text attached as message content for events at or above
    /// [`alert_threshold`](Self::alert_threshold).
    pub alert_text: Option<String>,
    /// Minimum severity at which `alert_text` is attached.
    pub alert_threshold: Severity,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            formatter: None,
            alert_text: None,
            alert_threshold: Severity::Error,
        }
    }
}

/// Map a severity to its embed colour.
pub fn severity_colour(level: Severity) -> u32 {
    match level {
        Severity::Error | Severity::Critical => COLOUR_ERROR,
        Severity::Warn => COLOUR_WARN,
        Severity::Debug => COLOUR_DEBUG,
        Severity::Trace | Severity::Info => COLOUR_DEFAULT,
    }
}

/// Build the webhook payload for a log event.
pub fn build_payload(event: &LogEvent, options: &PayloadOptions) -> WebhookPayload {
    let body = match (&event.formatted, &options.formatter) {
        (Some(rendered), _) => rendered.clone(),
        (None, Some(formatter)) => formatter.format(event),
        (None, None) => event.message.clone(),
    };
    let body = if body.is_empty() {
        "(no message)".to_owned()
    } else {
        body
    };

    let thread_name = event.metadata.thread_name.as_deref().unwrap_or("unnamed");
    let title = format!(
        "{} on {} ({})",
        event.level, thread_name, event.metadata.thread_id
    );

    let footer_text = if event.logger.is_empty() {
        "root".to_owned()
    } else {
        event.logger.clone()
    };

    let content = options
        .alert_text
        .as_deref()
        .filter(|_| event.level >= options.alert_threshold)
        .map(|text| truncate_chars(text, MAX_CONTENT_LEN));

    WebhookPayload {
        content,
        embeds: vec![Embed {
            title: truncate_chars(&title, MAX_TITLE_LEN),
            color: severity_colour(event.level),
            description: fenced(&body),
            timestamp: format_timestamp(event.metadata.timestamp),
            footer: EmbedFooter { text: footer_text },
        }],
    }
}

/// Build the content-only payload used for the synthetic close notice.
pub fn marker_payload(text: &str) -> WebhookPayload {
    WebhookPayload {
        content: Some(truncate_chars(text, MAX_CONTENT_LEN)),
        embeds: Vec::new(),
    }
}

/// Wrap `body` in a code fence, clipped so the fenced result stays within
/// the embed description limit.
fn fenced(body: &str) -> String {
    const FENCE: &str = "```";
    let budget = MAX_DESCRIPTION_LEN - 2 * FENCE.len();
    format!("{FENCE}{}{FENCE}", truncate_chars(body, budget))
}

/// Render a timestamp as RFC 3339 UTC with microsecond precision.
fn format_timestamp(timestamp: SystemTime) -> String {
    DateTime::<Utc>::from(timestamp).to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Clip `s` to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}
