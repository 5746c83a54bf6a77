//! Worker lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the delivery worker.
///
/// The worker only moves forward: `Idle` between spawn and loop entry,
/// `Running` while accepting commands, `Draining` once shutdown or
/// sender disconnect is observed, `Closed` after the transport has been
/// released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Closed = 3,
}

/// Shared cell recording the worker's state.
///
/// Written by the worker loop, readable from any thread.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> WorkerState {
        match self.0.load(Ordering::Acquire) {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Closed,
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
