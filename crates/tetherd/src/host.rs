//! Host runtime.
//!
//! A [`Host`] owns the registry, both halves of the bridge and the server
//! controller for one host application. It lives on the host thread: the
//! drainer it holds is not `Send`, so handlers only ever run there.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tether_config::Config;
use tracing::debug;

use crate::bridge::{
    self, BridgeHandle, CallbackId, DrainReport, FIRST_DRAIN_DELAY, HostDrainer,
    RecurringCallbacks, drain_callback,
};
use crate::health::HealthReporter;
use crate::lifecycle::{
    ControllerSettings, LIFECYCLE_TARGET, LifecycleError, ServerController, StartOutcome,
    StopOutcome,
};
use crate::registry::ToolRegistry;

/// Registry, bridge and server controller wired for one host.
pub struct Host {
    config: Config,
    registry: Arc<ToolRegistry>,
    bridge: BridgeHandle,
    drainer: Rc<RefCell<HostDrainer>>,
    controller: ServerController,
    reporter: Arc<dyn HealthReporter>,
    drain_callback: Option<CallbackId>,
}

impl Host {
    /// Builds a host around a frozen registry. Nothing runs until
    /// [`Host::activate`] or [`Host::start_server`] is called.
    #[must_use]
    pub fn new(config: Config, registry: ToolRegistry, reporter: Arc<dyn HealthReporter>) -> Self {
        let registry = Arc::new(registry);
        let (bridge, drainer) = bridge::channel();
        let controller = ServerController::new(
            Arc::clone(&registry),
            bridge.clone(),
            ControllerSettings::from_config(&config),
            Arc::clone(&reporter),
        );
        Self {
            config,
            registry,
            bridge,
            drainer: Rc::new(RefCell::new(drainer)),
            controller,
            reporter,
            drain_callback: None,
        }
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registered tools.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// A submitting handle for the bridge.
    #[must_use]
    pub fn bridge(&self) -> BridgeHandle {
        self.bridge.clone()
    }

    /// The server controller.
    #[must_use]
    pub fn controller(&self) -> &ServerController {
        &self.controller
    }

    /// Returns true while the drain callback is installed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.drain_callback.is_some()
    }

    /// Installs the periodic drain callback and, when `auto_start` is set,
    /// starts the server.
    ///
    /// The first drain runs after [`FIRST_DRAIN_DELAY`] and then every
    /// `drain_interval_ms`. Calling this twice installs a single callback.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the server fails to start. The drain
    /// callback stays installed so the server can be started later.
    pub fn activate(
        &mut self,
        callbacks: &mut dyn RecurringCallbacks,
    ) -> Result<Option<StartOutcome>, LifecycleError> {
        if self.drain_callback.is_none() {
            let callback = drain_callback(
                Rc::clone(&self.drainer),
                self.config.drain_batch_size(),
                self.config.drain_interval(),
            );
            self.drain_callback = Some(callbacks.register(FIRST_DRAIN_DELAY, callback));
            self.reporter.host_activated();
        }
        if !self.config.auto_start() {
            return Ok(None);
        }
        self.start_server().map(Some)
    }

    /// Stops the server, removes the drain callback and shuts the bridge
    /// down. Returns the number of queued commands that were cancelled.
    ///
    /// The bridge cannot be reopened; a deactivated host is finished.
    pub fn deactivate(&mut self, callbacks: &mut dyn RecurringCallbacks) -> usize {
        self.stop_server();
        if let Some(id) = self.drain_callback.take()
            && !callbacks.unregister(id)
        {
            debug!(target: LIFECYCLE_TARGET, id = id.0, "drain callback was already gone");
        }
        let cancelled = self.bridge.shutdown();
        self.reporter.host_deactivated(cancelled);
        cancelled
    }

    /// Runs one drain tick directly, as a headless loop does.
    pub fn drain_tick(&self) -> DrainReport {
        match self.drainer.try_borrow_mut() {
            Ok(mut drainer) => drainer.drain_once(self.config.drain_batch_size()),
            Err(_) => {
                debug!(target: LIFECYCLE_TARGET, "drain tick skipped: drainer already in use");
                DrainReport {
                    processed: 0,
                    remaining: self.bridge.pending_count(),
                    elapsed: Duration::ZERO,
                }
            }
        }
    }

    /// Starts the server on the configured endpoint.
    ///
    /// # Errors
    ///
    /// Propagates [`LifecycleError`] from the controller.
    pub fn start_server(&self) -> Result<StartOutcome, LifecycleError> {
        self.controller
            .start(&self.config.endpoint(), self.config.auth_token())
    }

    /// Stops the server if it is running.
    pub fn stop_server(&self) -> StopOutcome {
        self.controller.stop()
    }
}
