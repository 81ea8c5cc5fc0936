//! The cross-context command queue and its host-side drainer.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tether_protocol::ParamMap;
use tracing::{debug, error, warn};

use super::BRIDGE_TARGET;
use super::errors::{BridgeError, CommandError};
use super::pending::{PendingResult, ResolveStatus, ResultSlot, pending_pair};
use crate::registry::{ToolFailure, ToolHandler};

/// A command waiting to run on the host context.
struct QueuedCommand {
    sequence: u64,
    slot: ResultSlot,
    handler: ToolHandler,
    args: ParamMap,
}

#[derive(Default)]
struct QueueState {
    commands: VecDeque<QueuedCommand>,
    closed: bool,
    next_sequence: u64,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn shutdown(&self) -> usize {
        let drained: Vec<QueuedCommand> = {
            let mut state = self.lock();
            state.closed = true;
            state.commands.drain(..).collect()
        };

        let cancelled = drained.len();
        for command in drained {
            if command.slot.resolve(Err(CommandError::ShuttingDown)) == ResolveStatus::Abandoned {
                debug!(
                    target: BRIDGE_TARGET,
                    sequence = command.sequence,
                    "caller stopped waiting before shutdown"
                );
            }
        }
        if cancelled > 0 {
            warn!(
                target: BRIDGE_TARGET,
                cancelled,
                "cancelled queued commands during shutdown"
            );
        }
        cancelled
    }
}

/// Creates a bridge, returning the submitting handle and the drainer.
///
/// The handle may be cloned freely and moved to any thread. The drainer stays
/// on the calling thread, which becomes the host context.
#[must_use]
pub fn channel() -> (BridgeHandle, HostDrainer) {
    let shared = Arc::new(Shared::default());
    (
        BridgeHandle {
            shared: Arc::clone(&shared),
        },
        HostDrainer {
            shared,
            _host_bound: PhantomData,
        },
    )
}

/// Submitting half of the bridge, safe to share across threads.
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<Shared>,
}

impl BridgeHandle {
    /// Queues `handler` to run on the host context with `args`.
    ///
    /// The queue is unbounded, so submission never waits for space.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ShutDown`] once the bridge has been shut down;
    /// nothing is queued in that case.
    pub fn submit(&self, handler: ToolHandler, args: ParamMap) -> Result<PendingResult, BridgeError> {
        let (slot, pending) = pending_pair();
        let mut state = self.shared.lock();
        if state.closed {
            return Err(BridgeError::ShutDown);
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.commands.push_back(QueuedCommand {
            sequence,
            slot,
            handler,
            args,
        });
        Ok(pending)
    }

    /// Number of commands waiting to be drained.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.lock().commands.len()
    }

    /// Returns true once the bridge has been shut down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().closed
    }

    /// Cancels every queued command and rejects further submissions.
    ///
    /// Each cancelled caller receives [`CommandError::ShuttingDown`]. Returns
    /// the number of commands cancelled. Calling it again is harmless.
    pub fn shutdown(&self) -> usize {
        self.shared.shutdown()
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BridgeHandle")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Summary of a single drain tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Commands executed during the tick.
    pub processed: usize,
    /// Commands still queued after the tick.
    pub remaining: usize,
    /// Wall-clock time spent in the tick.
    pub elapsed: Duration,
}

/// Host-context half of the bridge.
///
/// The drainer is neither `Send` nor `Sync`, so it remains on the thread that
/// created the bridge and handlers only ever run there, one at a time.
pub struct HostDrainer {
    shared: Arc<Shared>,
    _host_bound: PhantomData<*const ()>,
}

impl HostDrainer {
    /// Executes up to `max_items` queued commands in submission order.
    ///
    /// Handler failures and panics are captured and delivered to the waiting
    /// caller; they never escape this method. Commands beyond `max_items`
    /// stay queued for the next tick.
    pub fn drain_once(&mut self, max_items: usize) -> DrainReport {
        let started = Instant::now();
        let mut processed = 0;

        while processed < max_items {
            let Some(command) = self.shared.lock().commands.pop_front() else {
                break;
            };
            processed += 1;
            execute(command);
        }

        DrainReport {
            processed,
            remaining: self.pending_count(),
            elapsed: started.elapsed(),
        }
    }

    /// Number of commands waiting to be drained.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.lock().commands.len()
    }

    /// Returns a new submitting handle for this bridge.
    #[must_use]
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancels every queued command and rejects further submissions.
    pub fn shutdown(&mut self) -> usize {
        self.shared.shutdown()
    }
}

fn execute(command: QueuedCommand) {
    let QueuedCommand {
        sequence,
        slot,
        handler,
        args,
    } = command;

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| handler(&args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(failure)) => {
            debug!(
                target: BRIDGE_TARGET,
                sequence,
                kind = failure.kind(),
                message = failure.message(),
                "handler returned a failure"
            );
            Err(CommandError::Failed(failure))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: BRIDGE_TARGET,
                sequence,
                message = %message,
                "handler panicked"
            );
            Err(CommandError::Failed(ToolFailure::panic(message)))
        }
    };

    report_resolution(sequence, slot.resolve(outcome));
}

fn report_resolution(sequence: u64, status: ResolveStatus) {
    match status {
        ResolveStatus::Delivered => {}
        ResolveStatus::Abandoned => debug!(
            target: BRIDGE_TARGET,
            sequence,
            "caller stopped waiting; discarding outcome"
        ),
        ResolveStatus::AlreadyResolved => warn!(
            target: BRIDGE_TARGET,
            sequence,
            "command was already resolved; ignoring second outcome"
        ),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("handler panicked")
    }
}
