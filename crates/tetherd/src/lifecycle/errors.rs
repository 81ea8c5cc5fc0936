use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::server::ServerError;

/// Errors reported when starting the server.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The server thread could not be spawned.
    #[error("failed to spawn server thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server reported a start-up failure.
    #[error("Server failed to start: {source}")]
    Start {
        /// Failure reported by the server thread.
        #[source]
        source: ServerError,
    },
    /// The server did not report readiness within the start timeout.
    #[error("Server failed to start within {timeout:?}")]
    StartTimeout {
        /// Bounded wait that elapsed.
        timeout: Duration,
    },
    /// The server thread exited before reporting readiness.
    #[error("Server failed to start: server thread exited unexpectedly")]
    ThreadExited,
}
