use std::io;

use thiserror::Error;

/// Errors raised while bringing the WebSocket server up.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The async runtime could not be created.
    #[error("failed to build server runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the listening socket failed.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        /// Endpoint that could not be bound.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound socket did not report its local address.
    #[error("failed to read local address of {endpoint}: {source}")]
    LocalAddr {
        /// Endpoint whose address was requested.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
