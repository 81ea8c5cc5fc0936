//! Server lifecycle management.
//!
//! [`ServerController`] runs the WebSocket server on a dedicated thread with
//! its own single-threaded async runtime, separate from the host context. A
//! start call waits a bounded time for the server to bind before returning;
//! a stop call signals the server, joins its thread with a bounded timeout,
//! and always leaves the controller in [`ServerState::Stopped`].

mod errors;
mod state;

use std::net::SocketAddr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tether_config::{Config, ServerEndpoint};
use tokio::sync::watch;
use tracing::{debug, error, warn};

pub use errors::LifecycleError;
pub use state::{ServerInfo, ServerState, StartOutcome, StopOutcome};

use crate::bridge::BridgeHandle;
use crate::health::HealthReporter;
use crate::registry::ToolRegistry;
use crate::server::{
    ConnectionCounter, ConnectionSettings, ProtocolServer, RequestRouter, SERVER_VERSION,
    ServerError,
};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Name given to the server thread.
pub const SERVER_THREAD_NAME: &str = "tether-server";

type Ready = Result<(SocketAddr, ConnectionCounter), ServerError>;

/// Timing and transport settings used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Bounded wait for the server to bind.
    pub start_timeout: Duration,
    /// Bounded join when stopping.
    pub stop_timeout: Duration,
    /// Optional ceiling on how long a request waits for its outcome.
    pub command_timeout: Option<Duration>,
    /// Per-connection limits.
    pub connection: ConnectionSettings,
}

impl ControllerSettings {
    /// Extracts controller settings from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_timeout: config.start_timeout(),
            stop_timeout: config.stop_timeout(),
            command_timeout: config.command_timeout(),
            connection: ConnectionSettings::from_config(config),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct RunningServer {
    endpoint: ServerEndpoint,
    local_addr: SocketAddr,
    connections: ConnectionCounter,
    shutdown: watch::Sender<bool>,
    exited: mpsc::Receiver<()>,
    thread: JoinHandle<()>,
}

#[derive(Default)]
struct Status {
    state: ServerState,
    running: Option<RunningServer>,
}

/// Starts, stops and inspects the WebSocket server.
///
/// All methods take `&self` and are safe to call from any thread. Start and
/// stop requests are serialised; introspection never waits for them.
pub struct ServerController {
    registry: Arc<ToolRegistry>,
    bridge: BridgeHandle,
    settings: ControllerSettings,
    reporter: Arc<dyn HealthReporter>,
    operation: Mutex<()>,
    status: Mutex<Status>,
}

impl ServerController {
    /// Builds a stopped controller.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        bridge: BridgeHandle,
        settings: ControllerSettings,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            registry,
            bridge,
            settings,
            reporter,
            operation: Mutex::new(()),
            status: Mutex::new(Status::default()),
        }
    }

    /// Starts the server on `endpoint`.
    ///
    /// When a server is already running this logs and returns
    /// [`StartOutcome::AlreadyRunning`] without touching it. An empty or
    /// absent `auth_token` disables authentication.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the thread cannot be spawned, the
    /// socket cannot be bound, or the server does not report readiness within
    /// the start timeout. The controller is left stopped in every case.
    pub fn start(
        &self,
        endpoint: &ServerEndpoint,
        auth_token: Option<&str>,
    ) -> Result<StartOutcome, LifecycleError> {
        let _operation = self.operation.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut status = self.status();
            if let Some(running) = status.running.as_ref() {
                if !running.thread.is_finished() {
                    self.reporter.server_already_running(&running.endpoint);
                    return Ok(StartOutcome::AlreadyRunning);
                }
                warn!(
                    target: LIFECYCLE_TARGET,
                    endpoint = %running.endpoint,
                    "previous server thread exited unexpectedly"
                );
            }
            status.running = None;
            status.state = ServerState::Starting;
        }

        self.reporter.server_starting(endpoint);
        match self.spawn(endpoint, auth_token) {
            Ok(running) => {
                let local_addr = running.local_addr;
                let mut status = self.status();
                status.state = ServerState::Running;
                status.running = Some(running);
                drop(status);
                self.reporter.server_running(local_addr);
                Ok(StartOutcome::Started(local_addr))
            }
            Err(error) => {
                self.status().state = ServerState::Stopped;
                self.reporter.server_start_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops the server, waiting at most the stop timeout for its thread.
    ///
    /// The controller always ends in [`ServerState::Stopped`], even when the
    /// thread has to be detached.
    pub fn stop(&self) -> StopOutcome {
        let _operation = self.operation.lock().unwrap_or_else(PoisonError::into_inner);
        let running = {
            let mut status = self.status();
            let Some(running) = status.running.take() else {
                status.state = ServerState::Stopped;
                return StopOutcome::NotRunning;
            };
            status.state = ServerState::Stopping;
            running
        };

        self.reporter.server_stopping();
        let RunningServer {
            shutdown,
            exited,
            thread,
            ..
        } = running;
        if shutdown.send(true).is_err() {
            debug!(target: LIFECYCLE_TARGET, "server loop already finished");
        }

        let outcome = match exited.recv_timeout(self.settings.stop_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    timeout_ms = self.settings.stop_timeout.as_millis(),
                    "server thread did not exit in time; detaching"
                );
                StopOutcome::TimedOut
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    error!(target: LIFECYCLE_TARGET, "server thread panicked");
                }
                StopOutcome::Joined
            }
        };

        self.status().state = ServerState::Stopped;
        self.reporter.server_stopped(outcome);
        outcome
    }

    /// Returns true while the server is accepting connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        let status = self.status();
        status.state == ServerState::Running
            && status
                .running
                .as_ref()
                .is_some_and(|running| !running.thread.is_finished())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.status().state
    }

    /// Address the running server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.status().running.as_ref().map(|running| running.local_addr)
    }

    /// Snapshot of the server for diagnostics.
    #[must_use]
    pub fn info(&self) -> ServerInfo {
        let running = self.is_running();
        let status = self.status();
        let server = status.running.as_ref();
        ServerInfo {
            running,
            state: status.state,
            version: SERVER_VERSION,
            tools_available: self.registry.len(),
            queue_size: self.bridge.pending_count(),
            endpoint: server.map(|server| server.endpoint.to_string()),
            local_addr: server.map(|server| server.local_addr),
            connections: server.map_or(0, |server| server.connections.open()),
        }
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn(
        &self,
        endpoint: &ServerEndpoint,
        auth_token: Option<&str>,
    ) -> Result<RunningServer, LifecycleError> {
        let router = RequestRouter::new(Arc::clone(&self.registry), self.bridge.clone(), auth_token)
            .with_command_timeout(self.settings.command_timeout);
        let (ready_tx, ready_rx) = mpsc::channel::<Ready>();
        let (exit_tx, exit_rx) = mpsc::channel::<()>();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let thread_endpoint = endpoint.clone();
        let connection = self.settings.connection;

        let thread = thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_owned())
            .spawn(move || {
                let _exit = exit_tx;
                serve(thread_endpoint, router, connection, &ready_tx, shutdown_rx);
            })
            .map_err(|source| LifecycleError::Spawn { source })?;

        match ready_rx.recv_timeout(self.settings.start_timeout) {
            Ok(Ok((local_addr, connections))) => Ok(RunningServer {
                endpoint: endpoint.clone(),
                local_addr,
                connections,
                shutdown: shutdown_tx,
                exited: exit_rx,
                thread,
            }),
            Ok(Err(source)) => {
                join_quietly(thread);
                Err(LifecycleError::Start { source })
            }
            Err(RecvTimeoutError::Disconnected) => {
                join_quietly(thread);
                Err(LifecycleError::ThreadExited)
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown_tx.send(true).is_err() {
                    debug!(target: LIFECYCLE_TARGET, "server loop already finished");
                }
                Err(LifecycleError::StartTimeout {
                    timeout: self.settings.start_timeout,
                })
            }
        }
    }
}

impl Drop for ServerController {
    fn drop(&mut self) {
        let running = self.status().running.is_some();
        if running {
            self.stop();
        }
    }
}

fn join_quietly(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        error!(target: LIFECYCLE_TARGET, "server thread panicked during start-up");
    }
}

fn serve(
    endpoint: ServerEndpoint,
    router: RequestRouter,
    settings: ConnectionSettings,
    ready: &mpsc::Sender<Ready>,
    shutdown: watch::Receiver<bool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(source) => {
            report_ready(ready, Err(ServerError::Runtime { source }));
            return;
        }
    };

    runtime.block_on(async move {
        let server = match ProtocolServer::bind(&endpoint, router, settings).await {
            Ok(server) => server,
            Err(error) => {
                report_ready(ready, Err(error));
                return;
            }
        };
        if report_ready(ready, Ok((server.local_addr(), server.connections()))) {
            server.run(shutdown).await;
        }
    });
}

fn report_ready(ready: &mpsc::Sender<Ready>, message: Ready) -> bool {
    if ready.send(message).is_err() {
        debug!(target: LIFECYCLE_TARGET, "start-up was abandoned before readiness");
        return false;
    }
    true
}
