//! Cross-context command dispatch.
//!
//! The bridge moves `(handler, args)` pairs from the network context to the
//! host context and carries each outcome back. It has two halves:
//!
//! - [`BridgeHandle`] is cloned into every connection task. [`BridgeHandle::submit`]
//!   appends a command to a global FIFO queue and returns a [`PendingResult`]
//!   that the caller awaits without blocking its scheduler.
//! - [`HostDrainer`] lives on the host thread. Each call to
//!   [`HostDrainer::drain_once`] pops a bounded batch, runs the handlers one at
//!   a time, and resolves their pending results.
//!
//! The queue is unbounded and shared by every connection, so commands run in
//! global submission order. Handlers are never concurrent with each other.
//! [`BridgeHandle::shutdown`] cancels everything still queued with a
//! "Server shutting down" error and turns later submissions away.
//!
//! Interactive hosts drive the drainer from a timer registered through
//! [`RecurringCallbacks`]; headless hosts call `drain_once` from their own
//! loop at the same cadence.

mod callbacks;
mod errors;
mod pending;
mod queue;

pub use callbacks::{
    CallbackId, FIRST_DRAIN_DELAY, RecurringCallback, RecurringCallbacks, drain_callback,
};
pub use errors::{BridgeError, CommandError};
pub use pending::{PendingResult, Resolution, ResolveStatus, ResultSlot};
pub use queue::{BridgeHandle, DrainReport, HostDrainer, channel};

#[cfg(test)]
pub(crate) use pending::pending_pair;

/// Tracing target for bridge activity.
pub(crate) const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");
