//! WebSocket RPC server.
//!
//! The server accepts any number of concurrent WebSocket clients. Each text
//! frame is one JSON request; each request receives exactly one JSON
//! response on the same connection, in completion order rather than
//! submission order.
//!
//! Requests are validated in a fixed order:
//!
//! 1. Frames that are not a JSON object receive an error with a `null` id and
//!    `null` tool.
//! 2. A missing or `null` id is rejected with "Missing request id".
//! 3. When an auth token is configured, a mismatched token is rejected with
//!    "Unauthorized - invalid token".
//! 4. `ping` and `list_tools` are answered immediately without touching the
//!    bridge.
//! 5. Unknown tools are rejected with "Unknown tool: <name>".
//! 6. Everything else is submitted to the bridge and answered with the
//!    handler's outcome.
//!
//! Connections never share mutable state beyond the bridge queue and the
//! registry, so a slow client cannot delay any other.

mod connection;
mod errors;
mod listener;
mod router;

pub use connection::{ConnectionCounter, ConnectionSettings};
pub use errors::ServerError;
pub use listener::ProtocolServer;
pub use router::{Envelope, RequestRouter};

/// Version reported by `ping` and server introspection.
pub const SERVER_VERSION: &str = "1.0.0";

/// Tracing target for server activity.
pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");
