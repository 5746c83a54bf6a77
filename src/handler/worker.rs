//! Background thread driving webhook delivery.
//!
//! A single consumer drains the dispatch queue in arrival order and
//! sends strictly one request at a time. Failed sends are escalated to
//! the reporter and never stall the queue.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use log::warn;

use crate::{
    payload::marker_payload,
    rate_limited_warner::RateLimitedWarner,
    reporter::{DeliveryFailure, DeliveryReporter},
    transport::Transport,
};

use super::{
    HandlerError, QueueItem,
    state::{StateCell, WorkerState},
};

/// Commands processed by the delivery worker.
pub(crate) enum WorkerCommand {
    Record(QueueItem),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Spawns the delivery thread and returns its command channel.
pub(crate) fn spawn_worker(
    transport: Box<dyn Transport>,
    close_marker: Option<String>,
    reporter: Arc<dyn DeliveryReporter>,
    state: Arc<StateCell>,
    queued: Arc<AtomicUsize>,
) -> (Sender<WorkerCommand>, thread::JoinHandle<()>) {
    let (tx, rx) = unbounded();
    let worker = DeliveryWorker {
        transport,
        close_marker,
        reporter,
        state,
        queued,
    };
    let handle = thread::spawn(move || worker.run(rx));
    (tx, handle)
}

/// Enqueues an item without blocking. Fails only when the worker has
/// gone away, which the caller surfaces as a closed handler.
pub(crate) fn enqueue_item(
    tx: &Sender<WorkerCommand>,
    item: QueueItem,
    queued: &AtomicUsize,
    warner: &RateLimitedWarner,
) -> Result<(), HandlerError> {
    queued.fetch_add(1, Ordering::Relaxed);
    if tx.send(WorkerCommand::Record(item)).is_err() {
        queued.fetch_sub(1, Ordering::Relaxed);
        warner.record_drop();
        warner.warn_if_due(|count| {
            warn!("DiscordWebhookHandler dropped {count} events after close");
        });
        return Err(HandlerError::Closed);
    }
    Ok(())
}

/// Asks the worker to acknowledge once every earlier event has been
/// delivered. Returns `false` on timeout or when the worker is gone.
pub(crate) fn flush_queue(tx: &Sender<WorkerCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx.send(WorkerCommand::Flush(ack_tx)).is_err() {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}

struct DeliveryWorker {
    transport: Box<dyn Transport>,
    close_marker: Option<String>,
    reporter: Arc<dyn DeliveryReporter>,
    state: Arc<StateCell>,
    queued: Arc<AtomicUsize>,
}

impl DeliveryWorker {
    fn run(mut self, rx: Receiver<WorkerCommand>) {
        self.state.set(WorkerState::Running);
        loop {
            match rx.recv() {
                Ok(WorkerCommand::Record(item)) => self.deliver(item),
                Ok(WorkerCommand::Flush(ack)) => {
                    let _ = ack.send(());
                }
                Ok(WorkerCommand::Shutdown(ack)) => {
                    self.shut_down(&rx);
                    let _ = ack.send(());
                    return;
                }
                // All senders dropped without an explicit shutdown.
                Err(_) => {
                    self.shut_down(&rx);
                    return;
                }
            }
        }
    }

    /// Drains the queue, posts the optional close notice and releases
    /// the transport. Runs exactly once per worker.
    fn shut_down(&mut self, rx: &Receiver<WorkerCommand>) {
        self.state.set(WorkerState::Draining);
        self.drain_pending(rx);
        self.send_close_marker();
        self.transport.release();
        self.state.set(WorkerState::Closed);
    }

    fn drain_pending(&mut self, rx: &Receiver<WorkerCommand>) {
        loop {
            match rx.try_recv() {
                Ok(WorkerCommand::Record(item)) => self.deliver(item),
                Ok(WorkerCommand::Flush(ack)) => {
                    let _ = ack.send(());
                }
                Ok(WorkerCommand::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn deliver(&mut self, item: QueueItem) {
        let outcome = self.transport.send(&item.payload);
        self.queued.fetch_sub(1, Ordering::Relaxed);
        if let Err(error) = outcome {
            self.reporter.delivery_failed(&DeliveryFailure {
                error,
                event: item.event,
            });
        }
    }

    fn send_close_marker(&mut self) {
        let Some(text) = self.close_marker.take() else {
            return;
        };
        if let Err(err) = self.transport.send(&marker_payload(&text)) {
            warn!("DiscordWebhookHandler close notice failed: {err}");
        }
    }
}
