//! Write-once result slots connecting the host context to waiting callers.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use super::errors::CommandError;

/// Final outcome delivered through a [`ResultSlot`].
pub type Resolution = Result<Value, CommandError>;

/// Creates a connected slot and pending result.
pub(crate) fn pending_pair() -> (ResultSlot, PendingResult) {
    let (sender, receiver) = oneshot::channel();
    (
        ResultSlot {
            sender: Mutex::new(Some(sender)),
        },
        PendingResult { receiver },
    )
}

/// Result of attempting to resolve a [`ResultSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    /// The outcome was handed to the waiting caller.
    Delivered,
    /// The slot had already been resolved; the new outcome was discarded.
    AlreadyResolved,
    /// The caller stopped waiting; the outcome was discarded.
    Abandoned,
}

/// Writing half of a pending result.
///
/// The slot may be resolved from any thread. Only the first resolution has
/// any effect; later attempts report [`ResolveStatus::AlreadyResolved`].
#[derive(Debug)]
pub struct ResultSlot {
    sender: Mutex<Option<oneshot::Sender<Resolution>>>,
}

impl ResultSlot {
    /// Delivers `resolution` unless the slot has already been resolved.
    pub fn resolve(&self, resolution: Resolution) -> ResolveStatus {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            None => ResolveStatus::AlreadyResolved,
            Some(sender) => match sender.send(resolution) {
                Ok(()) => ResolveStatus::Delivered,
                Err(_) => ResolveStatus::Abandoned,
            },
        }
    }

    /// Returns true once the slot has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Awaitable half of a pending result.
///
/// Resolves to the first outcome written to the matching [`ResultSlot`]. If
/// the slot is dropped without ever being resolved the result is
/// [`CommandError::Abandoned`].
#[derive(Debug)]
#[must_use = "a pending result does nothing unless awaited"]
pub struct PendingResult {
    receiver: oneshot::Receiver<Resolution>,
}

impl PendingResult {
    /// Returns the outcome if it is already available, without waiting.
    pub fn try_outcome(&mut self) -> Option<Resolution> {
        match self.receiver.try_recv() {
            Ok(resolution) => Some(resolution),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CommandError::Abandoned)),
        }
    }

    /// Blocks the current thread until the outcome arrives.
    ///
    /// Intended for synchronous callers outside any async runtime. Calling it
    /// from within a runtime panics.
    pub fn wait(self) -> Resolution {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(CommandError::Abandoned))
    }
}

impl Future for PendingResult {
    type Output = Resolution;

    fn poll(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(context)
            .map(|received| received.unwrap_or(Err(CommandError::Abandoned)))
    }
}
