//! Thread-safe command dispatch for single-threaded host applications.
//!
//! Many host applications own all of their state on one thread and crash or
//! corrupt data when touched from anywhere else. `tetherd` lets remote clients
//! drive such a host over a WebSocket JSON-RPC protocol without breaking that
//! rule:
//!
//! - The [`registry`] maps tool names to handlers. It is assembled during
//!   start-up and frozen before the server runs.
//! - The [`bridge`] carries commands from the network thread to the host
//!   thread in global FIFO order and carries each outcome back.
//! - The [`server`] accepts WebSocket clients on its own thread and async
//!   runtime, authenticates and validates each request, answers built-in tools
//!   directly and submits everything else to the bridge.
//! - The [`lifecycle`] controller starts and stops that server with bounded
//!   waits and reports its state.
//!
//! A [`Host`] ties these together for one host application. Interactive hosts
//! call [`Host::activate`] with their recurring-timer facility; headless
//! deployments run [`run_headless`], which drains the bridge in a plain loop.
//! Handlers only ever execute inside a drain, so they run on the host thread,
//! one at a time.

mod bootstrap;
pub mod bridge;
mod health;
mod host;
pub mod lifecycle;
mod process;
pub mod registry;
pub mod scene;
pub mod server;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Service, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use host::Host;
pub use lifecycle::{ServerController, ServerInfo, ServerState, StartOutcome, StopOutcome};
pub use process::{
    HeadlessError, HeadlessSummary, LaunchError, ShutdownError, ShutdownSignal,
    SystemShutdownSignal, demo_registry, run_headless, run_service, run_service_with,
};
pub use registry::{ToolFailure, ToolRegistry, ToolSpec};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
