//! Hand-cranked recurring-callback facility.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::bridge::{CallbackId, RecurringCallback, RecurringCallbacks};

/// Records registrations and fires callbacks only when told to.
#[derive(Default)]
pub struct ManualTimers {
    next: u64,
    callbacks: BTreeMap<CallbackId, RecurringCallback>,
    first_intervals: Vec<Duration>,
}

impl ManualTimers {
    /// Invokes every registered callback once, in registration order.
    pub fn fire_all(&mut self) {
        for callback in self.callbacks.values_mut() {
            let _ = callback();
        }
    }

    /// Number of callbacks currently registered.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// First intervals requested at registration.
    pub fn first_intervals(&self) -> &[Duration] {
        &self.first_intervals
    }
}

impl RecurringCallbacks for ManualTimers {
    fn register(&mut self, first_interval: Duration, callback: RecurringCallback) -> CallbackId {
        self.next += 1;
        let id = CallbackId(self.next);
        self.callbacks.insert(id, callback);
        self.first_intervals.push(first_interval);
        id
    }

    fn unregister(&mut self, id: CallbackId) -> bool {
        self.callbacks.remove(&id).is_some()
    }
}
