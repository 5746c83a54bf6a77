//! Logger-name filtering for the sink.
//!
//! Delivery failures and internal diagnostics are themselves logged, so
//! without a guard the sink would feed on its own output (and on that of
//! the HTTP stack underneath it). [`DependencyFilter`] discards events
//! whose logger name starts with a denied prefix before they reach the
//! queue.

use crate::record::LogEvent;

/// Logger-name prefixes denied by default.
///
/// Covers this crate and the delivery stack beneath both transports, so
/// their own log output can never loop back through the sink.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "dislog", "h2", "hyper", "mio", "reqwest", "rustls", "tokio", "tracing", "ureq", "want",
];

/// Prefix denylist applied to every event before it is enqueued.
///
/// The filter is `Send + Sync` so it can be consulted from any producer
/// thread.
#[derive(Clone, Debug)]
pub struct DependencyFilter {
    prefixes: Vec<String>,
}

impl DependencyFilter {
    /// Build a filter from an explicit prefix list.
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a filter that denies nothing.
    pub fn allow_all() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    /// Add a denied prefix to the filter.
    pub fn deny(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// The configured prefixes, in insertion order.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Return `true` if `logger` starts with any denied prefix.
    pub fn is_denied(&self, logger: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| logger.starts_with(prefix.as_str()))
    }

    /// Return `true` if `event` should be forwarded to the queue.
    pub fn should_forward(&self, event: &LogEvent) -> bool {
        !self.is_denied(&event.logger)
    }
}

impl Default for DependencyFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;
    use rstest::rstest;

    fn event(name: &str) -> LogEvent {
        LogEvent::new(name, Severity::Info, "msg")
    }

    #[rstest]
    #[case("dislog", true)]
    #[case("dislog::handler", true)]
    #[case("hyper::client::conn", true)]
    #[case("reqwest", true)]
    #[case("app", false)]
    #[case("my_service::auth", false)]
    fn default_denylist_behaviour(#[case] logger: &str, #[case] denied: bool) {
        let filter = DependencyFilter::default();
        assert_eq!(filter.is_denied(logger), denied);
        assert_eq!(filter.should_forward(&event(logger)), !denied);
    }

    #[test]
    fn allow_all_forwards_everything() {
        let filter = DependencyFilter::allow_all();
        assert!(filter.should_forward(&event("dislog")));
        assert!(filter.should_forward(&event("hyper")));
    }

    #[test]
    fn custom_prefixes_replace_defaults() {
        let filter = DependencyFilter::new(["noisy"]);
        assert!(filter.is_denied("noisy::module"));
        assert!(!filter.is_denied("hyper"));
    }

    #[test]
    fn deny_appends_a_prefix() {
        let filter = DependencyFilter::allow_all().deny("chatty");
        assert!(filter.is_denied("chatty::worker"));
        assert_eq!(filter.prefixes(), ["chatty".to_owned()]);
    }
}
