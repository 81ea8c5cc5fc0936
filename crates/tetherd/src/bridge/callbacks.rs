//! Integration with a host's recurring-callback facility.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{trace, warn};

use super::BRIDGE_TARGET;
use super::queue::HostDrainer;

/// Delay before the first drain tick after registration.
pub const FIRST_DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Identifier handed out by a [`RecurringCallbacks`] facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(pub u64);

/// Periodic callback run on the host context.
///
/// The return value is the delay until the next invocation, or `None` to stop
/// being called.
pub type RecurringCallback = Box<dyn FnMut() -> Option<Duration>>;

/// Recurring timer facility provided by an interactive host.
///
/// Callbacks run on the host context, so implementations never need to move
/// them across threads.
pub trait RecurringCallbacks {
    /// Schedules `callback`, first after `first_interval` and then after
    /// whatever delay each invocation returns.
    fn register(&mut self, first_interval: Duration, callback: RecurringCallback) -> CallbackId;

    /// Cancels a callback. Returns false when `id` was not registered.
    fn unregister(&mut self, id: CallbackId) -> bool;
}

/// Builds the callback that drains the bridge every `period`.
pub fn drain_callback(
    drainer: Rc<RefCell<HostDrainer>>,
    batch_size: usize,
    period: Duration,
) -> RecurringCallback {
    Box::new(move || {
        match drainer.try_borrow_mut() {
            Ok(mut drainer) => {
                let report = drainer.drain_once(batch_size);
                if report.processed > 0 {
                    trace!(
                        target: BRIDGE_TARGET,
                        processed = report.processed,
                        remaining = report.remaining,
                        elapsed_us = report.elapsed.as_micros(),
                        "drain tick"
                    );
                }
            }
            Err(_) => warn!(
                target: BRIDGE_TARGET,
                "drain tick skipped: drainer already in use"
            ),
        }
        Some(period)
    })
}
