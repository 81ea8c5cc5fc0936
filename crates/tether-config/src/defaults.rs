use crate::endpoint::ServerEndpoint;
use crate::logging::LogFormat;

/// Loopback interface the server binds to unless told otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 8765;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Period between drain ticks on the host context.
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 50;

/// Maximum number of commands executed per drain tick.
pub const DEFAULT_DRAIN_BATCH_SIZE: usize = 10;

/// Bounded wait for the server to report readiness.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 200;

/// Bounded join when stopping the server thread.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2_000;

/// Interval between keepalive pings sent to each client.
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 30;

/// Time a client has to answer a keepalive ping.
pub const DEFAULT_KEEPALIVE_TIMEOUT_SECS: u64 = 10;

/// Largest WebSocket message accepted from a client.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Number of headless ticks between status lines (roughly ten seconds).
pub const DEFAULT_STATUS_INTERVAL_TICKS: u64 = 200;

/// Default bind host as an owned string.
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default listen endpoint for the server.
pub fn default_endpoint() -> ServerEndpoint {
    ServerEndpoint::new(DEFAULT_HOST, DEFAULT_PORT)
}
