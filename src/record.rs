//! Log event representation.
//!
//! This module defines the `LogEvent` struct that captures a single log
//! occurrence along with the contextual metadata rendered into the webhook
//! embed: creation time and originating thread.

use std::fmt;
use std::thread;
use std::time::SystemTime;

use crate::level::Severity;

/// Return a numeric identifier for the current thread.
///
/// `ThreadId` exposes no stable numeric accessor, so the counter is read
/// out of its `Debug` form ("ThreadId(12)").
fn current_thread_id() -> u64 {
    let repr = format!("{:?}", thread::current().id());
    repr.trim_start_matches(|c: char| !c.is_ascii_digit())
        .trim_end_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}

/// Additional context associated with a log event.
#[derive(Clone, Debug)]
pub struct EventMetadata {
    /// Time the event was created.
    pub timestamp: SystemTime,
    /// Name of the thread that created the event (if any).
    pub thread_name: Option<String>,
    /// Numeric ID of the thread that created the event.
    pub thread_id: u64,
}

impl EventMetadata {
    /// Capture timestamp and thread info from the current execution context.
    pub fn capture() -> Self {
        let current = thread::current();
        Self {
            timestamp: SystemTime::now(),
            thread_name: current.name().map(ToString::to_string),
            thread_id: current_thread_id(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::capture()
    }
}

/// A single log occurrence submitted to the sink.
#[derive(Clone, Debug)]
pub struct LogEvent {
    /// Name of the logger that created this event.
    pub logger: String,
    /// Severity of the event.
    pub level: Severity,
    /// The log message content.
    pub message: String,
    /// Fully rendered text, when the producer has already applied its
    /// own formatting. Takes precedence over the raw message in the
    /// embed body.
    pub formatted: Option<String>,
    /// Contextual metadata for the event.
    pub metadata: EventMetadata,
}

impl LogEvent {
    /// Construct a new event, capturing metadata from the calling thread.
    pub fn new(logger: &str, level: Severity, message: &str) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            formatted: None,
            metadata: EventMetadata::capture(),
        }
    }

    /// Construct an event with explicit metadata, used verbatim.
    pub fn with_metadata(
        logger: &str,
        level: Severity,
        message: &str,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            formatted: None,
            metadata,
        }
    }

    /// Attach pre-rendered text to the event.
    pub fn with_formatted(mut self, text: impl Into<String>) -> Self {
        self.formatted = Some(text.into());
        self
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_captures_calling_thread() {
        let handle = thread::Builder::new()
            .name("event-origin".to_owned())
            .spawn(|| LogEvent::new("app", Severity::Info, "hi"))
            .expect("spawn capture thread");
        let event = handle.join().expect("join capture thread");
        assert_eq!(event.metadata.thread_name.as_deref(), Some("event-origin"));
        assert_ne!(event.metadata.thread_id, 0);
    }

    #[test]
    fn with_metadata_keeps_given_values() {
        let metadata = EventMetadata {
            timestamp: SystemTime::UNIX_EPOCH,
            thread_name: Some("fixed".to_owned()),
            thread_id: 7,
        };
        let event = LogEvent::with_metadata("app", Severity::Warn, "msg", metadata);
        assert_eq!(event.metadata.timestamp, SystemTime::UNIX_EPOCH);
        assert_eq!(event.metadata.thread_name.as_deref(), Some("fixed"));
        assert_eq!(event.metadata.thread_id, 7);
    }

    #[test]
    fn formatted_text_is_opt_in() {
        let event = LogEvent::new("app", Severity::Info, "raw");
        assert!(event.formatted.is_none());

        let event = event.with_formatted("[12:00] app raw");
        assert_eq!(event.formatted.as_deref(), Some("[12:00] app raw"));
    }

    #[test]
    fn display_shows_level_and_message() {
        let event = LogEvent::new("app", Severity::Error, "boom");
        assert_eq!(event.to_string(), "ERROR - boom");
    }
}
