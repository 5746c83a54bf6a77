//! Failure escalation.
//!
//! A send failure is never returned to the thread that logged the event;
//! by the time the transport reports it, that caller is long gone. The
//! worker instead hands the failure to a [`DeliveryReporter`] exactly once
//! and carries on with the next event.

use std::fmt;

use crate::{record::LogEvent, transport::TransportError};

/// Context handed to a reporter when a send fails.
#[derive(Debug)]
pub struct DeliveryFailure {
    /// The transport error that ended the attempt.
    pub error: TransportError,
    /// The event whose payload could not be delivered.
    pub event: LogEvent,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to deliver {} event from {:?}: {}",
            self.event.level, self.event.logger, self.error
        )
    }
}

/// Callback surface for delivery problems.
///
/// `delivery_failed` runs on the delivery worker; `records_dropped` runs
/// on the thread that gave up waiting for the drain. Implementations must
/// therefore be `Send + Sync`, and must not block for long: the worker
/// cannot deliver anything else while a reporter call is in flight.
pub trait DeliveryReporter: Send + Sync {
    /// A payload send failed. Reported once per event; the worker then
    /// moves on to the next one.
    fn delivery_failed(&self, failure: &DeliveryFailure);

    /// `count` events were still queued when a close deadline expired.
    /// The detached worker keeps draining them best-effort.
    fn records_dropped(&self, count: usize);
}

/// Default reporter that escalates through the `log` facade.
///
/// The default denylist covers this crate's own logger names, so these
/// reports cannot loop back into the sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl DeliveryReporter for LogReporter {
    fn delivery_failed(&self, failure: &DeliveryFailure) {
        log::error!("{failure}");
    }

    fn records_dropped(&self, count: usize) {
        log::warn!("abandoned {count} queued log events at close");
    }
}
