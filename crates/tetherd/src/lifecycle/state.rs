use std::fmt;
use std::net::SocketAddr;

use serde::Serialize;

/// Lifecycle of the WebSocket server.
///
/// The only legal path is `Stopped → Starting → Running → Stopping →
/// Stopped`; a failed start returns straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// No server thread exists.
    #[default]
    Stopped,
    /// A server thread has been spawned and is binding its socket.
    Starting,
    /// The server is accepting connections.
    Running,
    /// Shutdown has been requested.
    Stopping,
}

impl ServerState {
    /// Lowercase name used in logs and introspection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new server is listening on the given address.
    Started(SocketAddr),
    /// A server was already running or starting; nothing changed.
    AlreadyRunning,
}

/// Outcome of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The server thread exited and was joined.
    Joined,
    /// The server thread did not exit in time and was detached.
    TimedOut,
    /// No server was running.
    NotRunning,
}

/// Snapshot of the server for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Whether the server is accepting connections.
    pub running: bool,
    /// Current lifecycle state.
    pub state: ServerState,
    /// Server version.
    pub version: &'static str,
    /// Number of registered tools.
    pub tools_available: usize,
    /// Commands waiting for the host context.
    pub queue_size: usize,
    /// Endpoint requested at start, when running.
    pub endpoint: Option<String>,
    /// Address actually bound, when running.
    pub local_addr: Option<SocketAddr>,
    /// Open client connections.
    pub connections: usize,
}
