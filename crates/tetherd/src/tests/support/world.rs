//! BDD test world: owns the host, fake timers and recorded outcomes for step functions.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use rstest::fixture;
use serde_json::Value;
use tether_config::Config;
use tether_protocol::ParamMap;

use crate::bridge::{CommandError, PendingResult};
use crate::host::Host;
use crate::lifecycle::{LifecycleError, StartOutcome, StopOutcome};
use crate::process::demo_registry;
use crate::registry::handler;

use super::client::exchange_while_draining;
use super::config_loader::test_config;
use super::reporter::RecordingHealthReporter;
use super::timers::ManualTimers;

/// Scenario world shared across BDD steps.
pub struct HostWorld {
    pub reporter: Arc<RecordingHealthReporter>,
    pub timers: ManualTimers,
    host: Option<Host>,
    port_blocker: Option<TcpListener>,
    start_result: Option<Result<StartOutcome, LifecycleError>>,
    stop_result: Option<StopOutcome>,
    activation: Option<Result<Option<StartOutcome>, LifecycleError>>,
    cancelled: Option<usize>,
    pending: Vec<PendingResult>,
    responses: Vec<Value>,
}

impl HostWorld {
    /// Builds an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            timers: ManualTimers::default(),
            host: None,
            port_blocker: None,
            start_result: None,
            stop_result: None,
            activation: None,
            cancelled: None,
            pending: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Builds a host serving the demo tools.
    pub fn build_host(&mut self, adjust: impl FnOnce(&mut Config)) {
        let mut config = test_config();
        adjust(&mut config);
        let registry = demo_registry().expect("demo tools register");
        self.host = Some(Host::new(config, registry, self.reporter.clone()));
    }

    /// Builds a host configured for a port another socket already holds.
    pub fn build_host_on_taken_port(&mut self) {
        let blocker = TcpListener::bind("127.0.0.1:0").expect("bind blocker");
        let port = blocker.local_addr().expect("blocker address").port();
        self.port_blocker = Some(blocker);
        self.build_host(|config| config.port = port);
    }

    /// The host under test.
    pub fn host(&self) -> &Host {
        self.host.as_ref().expect("host has not been built")
    }

    fn host_mut(&mut self) -> &mut Host {
        self.host.as_mut().expect("host has not been built")
    }

    /// Starts the server and records the outcome.
    pub fn start(&mut self) {
        self.start_result = Some(self.host().start_server());
    }

    /// Stops the server and records the outcome.
    pub fn stop(&mut self) {
        self.stop_result = Some(self.host().stop_server());
    }

    /// Activates the host against the fake timers.
    pub fn activate(&mut self) {
        let mut timers = std::mem::take(&mut self.timers);
        self.activation = Some(self.host_mut().activate(&mut timers));
        self.timers = timers;
    }

    /// Deactivates the host against the fake timers.
    pub fn deactivate(&mut self) {
        let mut timers = std::mem::take(&mut self.timers);
        self.cancelled = Some(self.host_mut().deactivate(&mut timers));
        self.timers = timers;
    }

    /// Submits `count` no-op commands straight to the bridge.
    pub fn queue_commands(&mut self, count: usize) {
        let bridge = self.host().bridge();
        for _ in 0..count {
            let pending = bridge
                .submit(handler(|_| Ok(Value::Null)), ParamMap::new())
                .expect("bridge accepts commands");
            self.pending.push(pending);
        }
    }

    /// Sends frames from a client while the world drains the bridge.
    pub fn exchange(&mut self, frames: Vec<String>) {
        let addr = self.local_addr();
        self.responses = exchange_while_draining(self.host(), addr, frames);
    }

    /// Address of the running server.
    pub fn local_addr(&self) -> SocketAddr {
        self.host()
            .controller()
            .local_addr()
            .expect("server is not running")
    }

    /// Outcome of the most recent start request.
    pub fn start_result(&self) -> &Result<StartOutcome, LifecycleError> {
        self.start_result.as_ref().expect("server was never started")
    }

    /// Outcome of the most recent stop request.
    pub fn stop_result(&self) -> Option<StopOutcome> {
        self.stop_result
    }

    /// Outcome of the most recent activation.
    pub fn activation(&self) -> &Result<Option<StartOutcome>, LifecycleError> {
        self.activation.as_ref().expect("host was never activated")
    }

    /// Commands cancelled by the last deactivation.
    pub fn cancelled(&self) -> Option<usize> {
        self.cancelled
    }

    /// Resolutions of the commands queued by [`HostWorld::queue_commands`].
    pub fn pending_outcomes(&mut self) -> Vec<Option<Result<Value, CommandError>>> {
        self.pending
            .iter_mut()
            .map(PendingResult::try_outcome)
            .collect()
    }

    /// Responses received by the last exchange.
    pub fn responses(&self) -> &[Value] {
        &self.responses
    }
}

impl Default for HostWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture providing the shared BDD world.
#[fixture]
pub fn world() -> RefCell<HostWorld> {
    RefCell::new(HostWorld::new())
}
