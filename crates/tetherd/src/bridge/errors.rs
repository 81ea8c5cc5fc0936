use thiserror::Error;

use crate::registry::ToolFailure;

/// Errors returned to code submitting work to the bridge.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The bridge has been shut down and no longer accepts commands.
    #[error("command bridge has shut down")]
    ShutDown,
}

/// Reasons a submitted command did not produce a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The handler returned a failure or panicked.
    #[error("{0}")]
    Failed(ToolFailure),
    /// The bridge shut down before the command ran.
    #[error("Server shutting down")]
    ShuttingDown,
    /// The command was dropped without being resolved.
    #[error("command was dropped before it completed")]
    Abandoned,
}
