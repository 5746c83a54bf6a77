//! Installing the bridge as the process-wide logger.
//!
//! Kept in its own binary because the global logger slot can be
//! claimed only once per process.

mod test_utils;

use dislog::{DiscordWebhookBuilder, Severity, try_install};
use test_utils::{DeliveryLog, ScriptedTransport};

#[test]
fn installed_bridge_carries_log_macros_to_the_webhook() {
    let log = DeliveryLog::default();
    let handler = DiscordWebhookBuilder::new()
        .with_transport(ScriptedTransport::new(log.clone()))
        .with_level(Severity::Info)
        .build()
        .expect("handler builds");
    assert!(try_install(handler), "first install claims the global slot");
    assert_eq!(log::max_level(), log::LevelFilter::Trace);

    log::error!(target: "app::payments", "charge declined");
    log::info!(target: "app::payments", "retry scheduled");
    log::debug!(target: "app::payments", "ledger diff: 1");
    log::error!(target: "reqwest::connect", "pool exhausted");
    log::logger().flush();

    let descriptions = log.descriptions();
    assert_eq!(
        descriptions.len(),
        2,
        "debug sits below the gate and reqwest is denylisted"
    );
    assert!(descriptions[0].contains("charge declined"));
    assert!(descriptions[1].contains("retry scheduled"));

    // A repeat install reports the cached outcome; the late handler is
    // closed and the first bridge keeps the slot.
    let second_log = DeliveryLog::default();
    let second = DiscordWebhookBuilder::new()
        .with_transport(ScriptedTransport::new(second_log.clone()))
        .build()
        .expect("handler builds");
    assert!(try_install(second), "repeat installs report the cached outcome");

    log::error!(target: "app::payments", "still the first sink");
    log::logger().flush();

    assert_eq!(log.attempts(), 3, "the original bridge still owns the slot");
    assert_eq!(second_log.attempts(), 0);
    assert_eq!(second_log.releases(), 1, "the rejected handler was closed");
}
