//! Structured health reporting for bootstrap, server and host events.

use std::net::SocketAddr;
use std::sync::Arc;

use tether_config::{Config, ServerEndpoint};

use crate::bootstrap::BootstrapError;
use crate::lifecycle::{LifecycleError, StopOutcome};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the server thread is spawned.
    fn server_starting(&self, endpoint: &ServerEndpoint);

    /// Invoked once the server is accepting connections.
    fn server_running(&self, local_addr: SocketAddr);

    /// Invoked when the server fails to start.
    fn server_start_failed(&self, error: &LifecycleError);

    /// Invoked when a start request finds a server already running.
    fn server_already_running(&self, endpoint: &ServerEndpoint);

    /// Invoked when shutdown of the server begins.
    fn server_stopping(&self);

    /// Invoked when the server has stopped.
    fn server_stopped(&self, outcome: StopOutcome);

    /// Invoked after the host installs the drain callback.
    fn host_activated(&self);

    /// Invoked after the host tears the bridge down.
    fn host_deactivated(&self, cancelled: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_starting(&self, endpoint: &ServerEndpoint) {
        (**self).server_starting(endpoint);
    }

    fn server_running(&self, local_addr: SocketAddr) {
        (**self).server_running(local_addr);
    }

    fn server_start_failed(&self, error: &LifecycleError) {
        (**self).server_start_failed(error);
    }

    fn server_already_running(&self, endpoint: &ServerEndpoint) {
        (**self).server_already_running(endpoint);
    }

    fn server_stopping(&self) {
        (**self).server_stopping();
    }

    fn server_stopped(&self, outcome: StopOutcome) {
        (**self).server_stopped(outcome);
    }

    fn host_activated(&self) {
        (**self).host_activated();
    }

    fn host_deactivated(&self, cancelled: usize) {
        (**self).host_deactivated(cancelled);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.endpoint(),
            auth = config.auth_token().is_some(),
            auto_start = config.auto_start(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bootstrap failed"
        );
    }

    fn server_starting(&self, endpoint: &ServerEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_starting",
            endpoint = %endpoint,
            "starting server"
        );
    }

    fn server_running(&self, local_addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_running",
            local_addr = %local_addr,
            "server listening"
        );
    }

    fn server_start_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "server_start_failed",
            error = %error,
            "server failed to start"
        );
    }

    fn server_already_running(&self, endpoint: &ServerEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_already_running",
            endpoint = %endpoint,
            "server already running"
        );
    }

    fn server_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopping",
            "stopping server"
        );
    }

    fn server_stopped(&self, outcome: StopOutcome) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            outcome = ?outcome,
            "server stopped"
        );
    }

    fn host_activated(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "host_activated",
            "drain callback installed"
        );
    }

    fn host_deactivated(&self, cancelled: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "host_deactivated",
            cancelled,
            "bridge shut down"
        );
    }
}
