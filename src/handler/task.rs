//! Cooperative delivery task for Tokio runtimes.
//!
//! Mirrors the threaded worker's state machine on an async task: one
//! consumer, arrival-order delivery, a full drain before exit. Task
//! completion is additionally signalled on a capacity-1 channel so
//! threads outside the runtime can wait for the drain without entering
//! it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use log::warn;
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel,
};

use crate::{
    payload::marker_payload,
    rate_limited_warner::RateLimitedWarner,
    reporter::{DeliveryFailure, DeliveryReporter},
    transport::AsyncTransport,
};

use super::{
    HandlerError, QueueItem,
    state::{StateCell, WorkerState},
};

/// Commands processed by the delivery task.
pub(crate) enum TaskCommand {
    Record(QueueItem),
    Flush(crossbeam_channel::Sender<()>),
    Shutdown,
}

/// Spawns the delivery task onto `handle`'s runtime. The returned
/// receiver yields one message once the drain has finished.
pub(crate) fn spawn_task(
    handle: &tokio::runtime::Handle,
    transport: Box<dyn AsyncTransport>,
    close_marker: Option<String>,
    reporter: Arc<dyn DeliveryReporter>,
    state: Arc<StateCell>,
    queued: Arc<AtomicUsize>,
) -> (
    UnboundedSender<TaskCommand>,
    tokio::task::JoinHandle<()>,
    crossbeam_channel::Receiver<()>,
) {
    let (tx, rx) = unbounded_channel();
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let task = DeliveryTask {
        transport,
        close_marker,
        reporter,
        state,
        queued,
        done_tx,
    };
    let join = handle.spawn(task.run(rx));
    (tx, join, done_rx)
}

/// Enqueues an item without blocking or entering the runtime.
pub(crate) fn enqueue_item(
    tx: &UnboundedSender<TaskCommand>,
    item: QueueItem,
    queued: &AtomicUsize,
    warner: &RateLimitedWarner,
) -> Result<(), HandlerError> {
    queued.fetch_add(1, Ordering::Relaxed);
    if tx.send(TaskCommand::Record(item)).is_err() {
        queued.fetch_sub(1, Ordering::Relaxed);
        warner.record_drop();
        warner.warn_if_due(|count| {
            warn!("DiscordWebhookHandler dropped {count} events after close");
        });
        return Err(HandlerError::Closed);
    }
    Ok(())
}

/// Blocking flush for callers outside the runtime. Returns `false` on
/// timeout or when the task is gone.
pub(crate) fn flush_queue(tx: &UnboundedSender<TaskCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
    if tx.send(TaskCommand::Flush(ack_tx)).is_err() {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}

struct DeliveryTask {
    transport: Box<dyn AsyncTransport>,
    close_marker: Option<String>,
    reporter: Arc<dyn DeliveryReporter>,
    state: Arc<StateCell>,
    queued: Arc<AtomicUsize>,
    done_tx: crossbeam_channel::Sender<()>,
}

impl DeliveryTask {
    async fn run(mut self, mut rx: UnboundedReceiver<TaskCommand>) {
        self.state.set(WorkerState::Running);
        loop {
            match rx.recv().await {
                Some(TaskCommand::Record(item)) => self.deliver(item).await,
                Some(TaskCommand::Flush(ack)) => {
                    let _ = ack.try_send(());
                }
                // `None` means every sender was dropped without an
                // explicit shutdown; both paths drain before exit.
                Some(TaskCommand::Shutdown) | None => {
                    self.shut_down(&mut rx).await;
                    return;
                }
            }
        }
    }

    async fn shut_down(&mut self, rx: &mut UnboundedReceiver<TaskCommand>) {
        self.state.set(WorkerState::Draining);
        self.drain_pending(rx).await;
        self.send_close_marker().await;
        self.transport.release().await;
        self.state.set(WorkerState::Closed);
        let _ = self.done_tx.try_send(());
    }

    async fn drain_pending(&mut self, rx: &mut UnboundedReceiver<TaskCommand>) {
        loop {
            match rx.try_recv() {
                Ok(TaskCommand::Record(item)) => self.deliver(item).await,
                Ok(TaskCommand::Flush(ack)) => {
                    let _ = ack.try_send(());
                }
                Ok(TaskCommand::Shutdown) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    async fn deliver(&mut self, item: QueueItem) {
        let outcome = self.transport.send(&item.payload).await;
        self.queued.fetch_sub(1, Ordering::Relaxed);
        if let Err(error) = outcome {
            self.reporter.delivery_failed(&DeliveryFailure {
                error,
                event: item.event,
            });
        }
    }

    async fn send_close_marker(&mut self) {
        let Some(text) = self.close_marker.take() else {
            return;
        };
        if let Err(err) = self.transport.send(&marker_payload(&text)).await {
            warn!("DiscordWebhookHandler close notice failed: {err}");
        }
    }
}
