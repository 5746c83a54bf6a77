//! Send/Sync guarantees for core types.

use dislog::{
    DependencyFilter, DiscordWebhookBuilder, DiscordWebhookHandler, LogEvent, SharedFormatter,
    TransportError, WebhookLogBridge, WebhookPayload,
};
use rstest::rstest;
use static_assertions::assert_impl_all;

#[rstest]
fn handlers_cross_threads() {
    assert_impl_all!(DiscordWebhookHandler: Send, Sync);
    assert_impl_all!(WebhookLogBridge: Send, Sync);
    // Builders carry boxed transports, so they move but are not shared.
    assert_impl_all!(DiscordWebhookBuilder: Send);
}

#[rstest]
fn data_types_cross_threads() {
    assert_impl_all!(LogEvent: Send, Sync);
    assert_impl_all!(WebhookPayload: Send, Sync);
    assert_impl_all!(DependencyFilter: Send, Sync);
    assert_impl_all!(SharedFormatter: Send, Sync);
    assert_impl_all!(TransportError: Send, Sync);
}
