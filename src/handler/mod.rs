//! Public handler type exported by the crate.
//!
//! [`DiscordWebhookHandler`] accepts log events from any thread without
//! blocking and hands them to a single delivery worker, which posts
//! them to the webhook one request at a time in arrival order. The
//! worker runs either on a dedicated thread or as a task on a Tokio
//! runtime; closing the handler drains whatever is queued before the
//! HTTP client is released.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    filter::DependencyFilter,
    level::Severity,
    payload::{PayloadOptions, WebhookPayload, build_payload},
    rate_limited_warner::RateLimitedWarner,
    record::LogEvent,
    reporter::{DeliveryReporter, LogReporter},
    transport::{AsyncTransport, Transport, UreqTransport},
};

mod builder;
mod config;
mod state;
mod task;
mod worker;

pub use builder::{DiscordWebhookBuilder, HandlerBuildError};
pub use config::{ConcurrencyMode, DEFAULT_FLUSH_TIMEOUT, HandlerConfig};
pub use state::WorkerState;

use state::StateCell;
use task::TaskCommand;
use worker::WorkerCommand;

/// Errors returned when submitting an event for delivery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler was closed; the event was dropped.
    #[error("handler is closed")]
    Closed,
}

/// Handler forwarding log events to a Discord webhook.
///
/// Producers never wait on the network: `handle` enqueues and returns.
/// Delivery failures are escalated to the configured
/// [`DeliveryReporter`] rather than surfaced to callers.
pub struct DiscordWebhookHandler {
    link: WorkerLink,
    level: Severity,
    filter: DependencyFilter,
    options: PayloadOptions,
    state: Arc<StateCell>,
    queued: Arc<AtomicUsize>,
    warner: RateLimitedWarner,
    reporter: Arc<dyn DeliveryReporter>,
    close_timeout: Option<Duration>,
    flush_timeout: Duration,
}

/// A payload queued for delivery, paired with the event it was built
/// from so a failed send can be reported with its context. Built by the
/// producer, owned by the queue, consumed by the worker.
pub(crate) struct QueueItem {
    pub(crate) payload: WebhookPayload,
    pub(crate) event: LogEvent,
}

/// Channel and join handle for whichever worker flavour was spawned.
enum WorkerLink {
    Thread {
        tx: Option<crossbeam_channel::Sender<WorkerCommand>>,
        handle: Mutex<Option<thread::JoinHandle<()>>>,
    },
    Task {
        tx: Option<tokio::sync::mpsc::UnboundedSender<TaskCommand>>,
        task: Mutex<Option<tokio::task::JoinHandle<()>>>,
        done_rx: crossbeam_channel::Receiver<()>,
    },
}

impl DiscordWebhookHandler {
    /// Build a threaded handler POSTing to `url` with default settings.
    pub fn new(url: impl Into<String>) -> Result<Self, HandlerBuildError> {
        DiscordWebhookBuilder::new().with_url(url).build()
    }

    /// Build a threaded handler POSTing to `url` with the given
    /// settings.
    ///
    /// The built-in blocking client uses the default timeouts; reach
    /// for [`builder`](Self::builder) to tune the client or to run
    /// cooperatively.
    pub fn with_config(
        url: impl Into<String>,
        config: HandlerConfig,
    ) -> Result<Self, HandlerBuildError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(HandlerBuildError::InvalidConfig(
                "webhook URL must not be empty".into(),
            ));
        }
        if config.flush_timeout.is_zero() {
            return Err(HandlerBuildError::InvalidConfig(
                "flush_timeout must be greater than zero".into(),
            ));
        }
        let transport = Box::new(UreqTransport::new(url));
        Ok(Self::spawn_threaded(config, transport, Arc::new(LogReporter)))
    }

    /// Start configuring a handler.
    pub fn builder() -> DiscordWebhookBuilder {
        DiscordWebhookBuilder::new()
    }

    pub(crate) fn spawn_threaded(
        config: HandlerConfig,
        transport: Box<dyn Transport>,
        reporter: Arc<dyn DeliveryReporter>,
    ) -> Self {
        let state = Arc::new(StateCell::new());
        let queued = Arc::new(AtomicUsize::new(0));
        let warner = RateLimitedWarner::new(config.warn_interval);
        let (tx, handle) = worker::spawn_worker(
            transport,
            config.close_marker,
            Arc::clone(&reporter),
            Arc::clone(&state),
            Arc::clone(&queued),
        );
        Self {
            link: WorkerLink::Thread {
                tx: Some(tx),
                handle: Mutex::new(Some(handle)),
            },
            level: config.level,
            filter: config.filter,
            options: config.options,
            state,
            queued,
            warner,
            reporter,
            close_timeout: config.close_timeout,
            flush_timeout: config.flush_timeout,
        }
    }

    pub(crate) fn spawn_cooperative(
        config: HandlerConfig,
        transport: Box<dyn AsyncTransport>,
        reporter: Arc<dyn DeliveryReporter>,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        let state = Arc::new(StateCell::new());
        let queued = Arc::new(AtomicUsize::new(0));
        let warner = RateLimitedWarner::new(config.warn_interval);
        let (tx, join, done_rx) = task::spawn_task(
            runtime,
            transport,
            config.close_marker,
            Arc::clone(&reporter),
            Arc::clone(&state),
            Arc::clone(&queued),
        );
        Self {
            link: WorkerLink::Task {
                tx: Some(tx),
                task: Mutex::new(Some(join)),
                done_rx,
            },
            level: config.level,
            filter: config.filter,
            options: config.options,
            state,
            queued,
            warner,
            reporter,
            close_timeout: config.close_timeout,
            flush_timeout: config.flush_timeout,
        }
    }

    /// Submit an event for delivery.
    ///
    /// The payload is built here, on the calling thread, and queued for
    /// the worker; the call returns without waiting on the network.
    /// Events below the configured level or from denylisted loggers are
    /// discarded silently; only submission after close reports an
    /// error.
    pub fn handle(&self, event: LogEvent) -> Result<(), HandlerError> {
        if event.level < self.level || !self.filter.should_forward(&event) {
            return Ok(());
        }
        let item = QueueItem {
            payload: build_payload(&event, &self.options),
            event,
        };
        match &self.link {
            WorkerLink::Thread { tx: Some(tx), .. } => {
                worker::enqueue_item(tx, item, &self.queued, &self.warner)
            }
            WorkerLink::Task { tx: Some(tx), .. } => {
                task::enqueue_item(tx, item, &self.queued, &self.warner)
            }
            _ => {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    log::warn!("DiscordWebhookHandler dropped {count} events after close");
                });
                Err(HandlerError::Closed)
            }
        }
    }

    /// Current lifecycle state of the delivery worker.
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Minimum severity accepted for delivery.
    pub fn level(&self) -> Severity {
        self.level
    }

    /// Logger-name filter applied before enqueueing.
    pub fn filter(&self) -> &DependencyFilter {
        &self.filter
    }

    /// Number of events accepted but not yet attempted.
    pub fn pending(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Wait until every event enqueued before this call has been
    /// attempted. Returns `false` on timeout, after close, or when a
    /// cooperative handler is flushed from inside its own runtime,
    /// where blocking would stall the worker itself.
    pub fn flush(&self) -> bool {
        self.warner.flush(|count| {
            log::warn!("DiscordWebhookHandler dropped {count} events in the last interval");
        });
        match &self.link {
            WorkerLink::Thread { tx: Some(tx), .. } => {
                worker::flush_queue(tx, self.flush_timeout)
            }
            WorkerLink::Task { tx: Some(tx), .. } => {
                if tokio::runtime::Handle::try_current().is_ok() {
                    return false;
                }
                task::flush_queue(tx, self.flush_timeout)
            }
            _ => false,
        }
    }

    /// Awaitable variant of [`flush`](Self::flush) for callers on a
    /// Tokio runtime.
    ///
    /// The wait for the worker's acknowledgement happens on the
    /// blocking pool, so the delivery task keeps running while the
    /// caller is suspended. Returns `false` on timeout or after close.
    pub async fn flush_async(&self) -> bool {
        self.warner.flush(|count| {
            log::warn!("DiscordWebhookHandler dropped {count} events in the last interval");
        });
        let timeout = self.flush_timeout;
        match &self.link {
            WorkerLink::Thread { tx: Some(tx), .. } => {
                let tx = tx.clone();
                tokio::task::spawn_blocking(move || worker::flush_queue(&tx, timeout))
                    .await
                    .unwrap_or(false)
            }
            WorkerLink::Task { tx: Some(tx), .. } => {
                let tx = tx.clone();
                tokio::task::spawn_blocking(move || task::flush_queue(&tx, timeout))
                    .await
                    .unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Close the handler, draining queued events before the transport
    /// is released.
    ///
    /// The first call initiates the drain; later calls return
    /// immediately. With a threaded worker this blocks until the drain
    /// finishes or `close_timeout` expires, in which case remaining
    /// events are reported as dropped and the worker is detached to
    /// finish in the background. With a cooperative worker the call
    /// waits the same way from outside the runtime but returns at once
    /// on a runtime thread, leaving the drain to the spawned task; use
    /// [`shutdown`](Self::shutdown) to await it instead.
    pub fn close(&mut self) {
        if matches!(self.link, WorkerLink::Thread { .. }) {
            self.close_thread();
        } else {
            self.close_task();
        }
    }

    /// Close the handler from async context, awaiting the drain.
    ///
    /// For cooperative handlers this never blocks the runtime. For
    /// threaded handlers it delegates to [`close`](Self::close), which
    /// blocks the calling thread while the worker drains.
    pub async fn shutdown(&mut self) {
        if matches!(self.link, WorkerLink::Thread { .. }) {
            self.close();
            return;
        }
        let WorkerLink::Task { tx, task, .. } = &mut self.link else {
            return;
        };
        if let Some(tx) = tx.take() {
            let _ = tx.send(TaskCommand::Shutdown);
        }
        let Some(join) = task.lock().take() else {
            return;
        };
        match self.close_timeout {
            None => {
                if join.await.is_err() {
                    log::warn!("DiscordWebhookHandler: delivery task panicked");
                }
            }
            Some(timeout) => match tokio::time::timeout(timeout, join).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => log::warn!("DiscordWebhookHandler: delivery task panicked"),
                Err(_) => self.report_abandoned(),
            },
        }
    }

    fn close_thread(&mut self) {
        let WorkerLink::Thread { tx, handle } = &mut self.link else {
            return;
        };
        let Some(tx) = tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(WorkerCommand::Shutdown(ack_tx)).is_err() {
            Self::join_thread(handle);
            return;
        }
        drop(tx);
        let timed_out = match self.close_timeout {
            None => {
                // Blocks until the ack arrives or the worker dies; a
                // disconnect is surfaced by the join below.
                let _ = ack_rx.recv();
                false
            }
            Some(timeout) => matches!(
                ack_rx.recv_timeout(timeout),
                Err(crossbeam_channel::RecvTimeoutError::Timeout)
            ),
        };
        if timed_out {
            // Still mid-drain. Detach the worker so it can finish in
            // the background rather than blocking here.
            handle.lock().take();
            self.report_abandoned();
            return;
        }
        Self::join_thread(handle);
    }

    fn close_task(&mut self) {
        let WorkerLink::Task { tx, task, done_rx } = &mut self.link else {
            return;
        };
        let Some(tx) = tx.take() else {
            return;
        };
        if tx.send(TaskCommand::Shutdown).is_err() {
            task.lock().take();
            return;
        }
        drop(tx);
        // Blocking on a runtime thread would stall the very task that
        // performs the drain.
        if tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        let drained = match self.close_timeout {
            None => done_rx.recv().is_ok(),
            Some(timeout) => done_rx.recv_timeout(timeout).is_ok(),
        };
        task.lock().take();
        if !drained {
            self.report_abandoned();
        }
    }

    fn join_thread(handle: &Mutex<Option<thread::JoinHandle<()>>>) {
        let Some(handle) = handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("DiscordWebhookHandler: delivery worker panicked");
        }
    }

    fn report_abandoned(&self) {
        let left = self.queued.load(Ordering::Relaxed);
        if left > 0 {
            self.reporter.records_dropped(left);
        }
        log::warn!("DiscordWebhookHandler close timed out with {left} events queued");
    }
}

impl Drop for DiscordWebhookHandler {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DiscordWebhookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordWebhookHandler")
            .field("level", &self.level)
            .field("state", &self.state.get())
            .field("pending", &self.queued.load(Ordering::Relaxed))
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}
