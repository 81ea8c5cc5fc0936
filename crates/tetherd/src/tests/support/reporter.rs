//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use tether_config::{Config, ServerEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::lifecycle::{LifecycleError, StopOutcome};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Server start initiated for an endpoint.
    ServerStarting(String),
    /// Server bound to an address.
    ServerRunning(SocketAddr),
    /// Server failed to start with an error description.
    ServerStartFailed(String),
    /// Start request found a running server.
    ServerAlreadyRunning,
    /// Server shutdown initiated.
    ServerStopping,
    /// Server stopped.
    ServerStopped(StopOutcome),
    /// Drain callback installed.
    HostActivated,
    /// Bridge shut down with the number of cancelled commands.
    HostDeactivated(usize),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Returns true when any recorded event satisfies `predicate`.
    pub fn saw(&self, predicate: impl Fn(&HealthEvent) -> bool) -> bool {
        self.events().iter().any(predicate)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_starting(&self, endpoint: &ServerEndpoint) {
        self.record(HealthEvent::ServerStarting(endpoint.to_string()));
    }

    fn server_running(&self, local_addr: SocketAddr) {
        self.record(HealthEvent::ServerRunning(local_addr));
    }

    fn server_start_failed(&self, error: &LifecycleError) {
        self.record(HealthEvent::ServerStartFailed(error.to_string()));
    }

    fn server_already_running(&self, _endpoint: &ServerEndpoint) {
        self.record(HealthEvent::ServerAlreadyRunning);
    }

    fn server_stopping(&self) {
        self.record(HealthEvent::ServerStopping);
    }

    fn server_stopped(&self, outcome: StopOutcome) {
        self.record(HealthEvent::ServerStopped(outcome));
    }

    fn host_activated(&self) {
        self.record(HealthEvent::HostActivated);
    }

    fn host_deactivated(&self, cancelled: usize) {
        self.record(HealthEvent::HostDeactivated(cancelled));
    }
}
