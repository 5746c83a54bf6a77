//! Test doubles for exercising handlers without touching the network.
//!
//! `ScriptedTransport` and `AsyncScriptedTransport` record every
//! payload they are asked to send into a shared [`DeliveryLog`] and can
//! be scripted to fail or stall on chosen calls. `CollectingReporter`
//! captures escalated failures instead of logging them.

// Not every test binary exercises every double.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use dislog::{
    AsyncTransport, DeliveryFailure, DeliveryReporter, LogEvent, Transport, TransportError,
    WebhookPayload,
};

/// Shared record of everything a scripted transport was asked to do.
#[derive(Clone, Default)]
pub struct DeliveryLog {
    inner: Arc<DeliveryLogInner>,
}

#[derive(Default)]
struct DeliveryLogInner {
    payloads: Mutex<Vec<WebhookPayload>>,
    releases: AtomicUsize,
}

impl DeliveryLog {
    /// Every payload attempted so far, in send order.
    pub fn payloads(&self) -> Vec<WebhookPayload> {
        self.inner.payloads.lock().clone()
    }

    /// Embed descriptions of every attempted payload, in send order.
    /// Payloads without embeds (close markers) contribute nothing.
    pub fn descriptions(&self) -> Vec<String> {
        self.inner
            .payloads
            .lock()
            .iter()
            .flat_map(|payload| payload.embeds.iter().map(|embed| embed.description.clone()))
            .collect()
    }

    /// Message content of every attempted payload, in send order.
    pub fn contents(&self) -> Vec<Option<String>> {
        self.inner
            .payloads
            .lock()
            .iter()
            .map(|payload| payload.content.clone())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.inner.payloads.lock().len()
    }

    /// How many times the transport was released.
    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::Relaxed)
    }

    fn record(&self, payload: &WebhookPayload) {
        self.inner.payloads.lock().push(payload.clone());
    }

    fn record_release(&self) {
        self.inner.releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Blocking transport double with scriptable failures and delays.
pub struct ScriptedTransport {
    log: DeliveryLog,
    calls: usize,
    failures: HashMap<usize, u16>,
    send_delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(log: DeliveryLog) -> Self {
        Self {
            log,
            calls: 0,
            failures: HashMap::new(),
            send_delay: None,
        }
    }

    /// Fail the `call`th send (1-based) with the given HTTP status.
    pub fn failing_call(mut self, call: usize, status: u16) -> Self {
        self.failures.insert(call, status);
        self
    }

    /// Sleep for `delay` inside every send.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError> {
        if let Some(delay) = self.send_delay {
            thread::sleep(delay);
        }
        self.calls += 1;
        self.log.record(payload);
        match self.failures.remove(&self.calls) {
            Some(status) => Err(TransportError::Status { status }),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        self.log.record_release();
    }
}

/// Asynchronous twin of [`ScriptedTransport`].
pub struct AsyncScriptedTransport {
    log: DeliveryLog,
    calls: usize,
    failures: HashMap<usize, u16>,
    send_delay: Option<Duration>,
}

impl AsyncScriptedTransport {
    pub fn new(log: DeliveryLog) -> Self {
        Self {
            log,
            calls: 0,
            failures: HashMap::new(),
            send_delay: None,
        }
    }

    pub fn failing_call(mut self, call: usize, status: u16) -> Self {
        self.failures.insert(call, status);
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }
}

#[async_trait]
impl AsyncTransport for AsyncScriptedTransport {
    async fn send(&mut self, payload: &WebhookPayload) -> Result<(), TransportError> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls += 1;
        self.log.record(payload);
        match self.failures.remove(&self.calls) {
            Some(status) => Err(TransportError::Status { status }),
            None => Ok(()),
        }
    }

    async fn release(&mut self) {
        self.log.record_release();
    }
}

/// Reporter that captures escalations for later assertions.
#[derive(Clone, Default)]
pub struct CollectingReporter {
    inner: Arc<ReporterInner>,
}

#[derive(Default)]
struct ReporterInner {
    failures: Mutex<Vec<(String, LogEvent)>>,
    dropped: AtomicUsize,
}

impl CollectingReporter {
    /// Escalated failures as `(error display, failed event)` pairs.
    pub fn failures(&self) -> Vec<(String, LogEvent)> {
        self.inner.failures.lock().clone()
    }

    /// Total events reported abandoned by timed-out closes.
    pub fn dropped(&self) -> usize {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

impl DeliveryReporter for CollectingReporter {
    fn delivery_failed(&self, failure: &DeliveryFailure) {
        self.inner
            .failures
            .lock()
            .push((failure.error.to_string(), failure.event.clone()));
    }

    fn records_dropped(&self, count: usize) {
        self.inner.dropped.fetch_add(count, Ordering::Relaxed);
    }
}
