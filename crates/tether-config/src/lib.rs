//! Shared configuration for the Tether server and client.
//!
//! [`Config`] is assembled by `ortho_config` from built-in defaults, an
//! optional configuration file, `TETHER_*` environment variables and
//! command-line flags, in increasing order of precedence. Both `tetherd` and
//! the `tether` client load the same structure so that a single file can
//! describe the endpoint, the shared auth token and the logging set-up.

mod defaults;
mod endpoint;
mod logging;

use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DRAIN_BATCH_SIZE, DEFAULT_DRAIN_INTERVAL_MS, DEFAULT_HOST,
    DEFAULT_KEEPALIVE_INTERVAL_SECS, DEFAULT_KEEPALIVE_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_PORT, DEFAULT_START_TIMEOUT_MS,
    DEFAULT_STATUS_INTERVAL_TICKS, DEFAULT_STOP_TIMEOUT_MS, default_endpoint, default_host,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{ServerEndpoint, SocketParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TETHER")]
pub struct Config {
    /// Interface the server binds to and the client connects to.
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// WebSocket port.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Shared secret clients must present. Empty or absent disables auth.
    pub auth_token: Option<String>,
    /// Starts the server as soon as the host runtime activates. Unset means
    /// on; read it through [`Config::auto_start`].
    pub auto_start: Option<bool>,
    /// Milliseconds between drain ticks on the host context.
    #[ortho_config(default = DEFAULT_DRAIN_INTERVAL_MS)]
    pub drain_interval_ms: u64,
    /// Commands executed per drain tick.
    #[ortho_config(default = DEFAULT_DRAIN_BATCH_SIZE)]
    pub drain_batch_size: usize,
    /// Bounded wait for the server thread to report readiness.
    #[ortho_config(default = DEFAULT_START_TIMEOUT_MS)]
    pub start_timeout_ms: u64,
    /// Bounded join when stopping the server thread.
    #[ortho_config(default = DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u64,
    /// Optional ceiling on how long a connection waits for a command outcome.
    pub command_timeout_ms: Option<u64>,
    /// Seconds between keepalive pings. `0` disables keepalive.
    #[ortho_config(default = DEFAULT_KEEPALIVE_INTERVAL_SECS)]
    pub keepalive_interval_secs: u64,
    /// Seconds a client has to answer a keepalive ping. `0` disables
    /// keepalive.
    #[ortho_config(default = DEFAULT_KEEPALIVE_TIMEOUT_SECS)]
    pub keepalive_timeout_secs: u64,
    /// Largest inbound WebSocket message in bytes.
    #[ortho_config(default = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,
    /// Headless ticks between status log lines.
    #[ortho_config(default = DEFAULT_STATUS_INTERVAL_TICKS)]
    pub status_interval_ticks: u64,
    /// `tracing` filter directive.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            auth_token: None,
            auto_start: None,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            drain_batch_size: DEFAULT_DRAIN_BATCH_SIZE,
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            command_timeout_ms: None,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
            keepalive_timeout_secs: DEFAULT_KEEPALIVE_TIMEOUT_SECS,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            status_interval_ticks: DEFAULT_STATUS_INTERVAL_TICKS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Listen endpoint assembled from `host` and `port`.
    #[must_use]
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host.clone(), self.port)
    }

    /// Configured auth token, treating an empty string as absent.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Whether the host runtime starts the server on activation.
    #[must_use]
    pub fn auto_start(&self) -> bool {
        self.auto_start.unwrap_or(true)
    }

    /// Commands executed per drain tick, never less than one.
    #[must_use]
    pub fn drain_batch_size(&self) -> usize {
        self.drain_batch_size.max(1)
    }

    /// Drain period as a [`Duration`].
    #[must_use]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    /// Start-up readiness wait as a [`Duration`].
    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Stop join ceiling as a [`Duration`].
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Optional per-command wait ceiling.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }

    /// Keepalive ping period.
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Keepalive pong deadline.
    #[must_use]
    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_start_is_on_unless_disabled() {
        let mut config = Config::default();
        assert!(config.auto_start());
        config.auto_start = Some(false);
        assert!(!config.auto_start());
        config.auto_start = Some(true);
        assert!(config.auto_start());
    }

    #[test]
    fn zero_batch_size_still_drains_one_command() {
        let config = Config {
            drain_batch_size: 0,
            ..Config::default()
        };
        assert_eq!(config.drain_batch_size(), 1);
    }

    #[test]
    fn default_endpoint_is_loopback() {
        let config = Config::default();
        assert_eq!(config.endpoint(), default_endpoint());
        assert_eq!(config.endpoint().to_string(), "ws://127.0.0.1:8765");
    }

    #[test]
    fn empty_token_disables_auth() {
        let config = Config {
            auth_token: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(config.auth_token(), None);
    }

    #[test]
    fn command_timeout_is_unset_by_default() {
        assert_eq!(Config::default().command_timeout(), None);
    }
}
