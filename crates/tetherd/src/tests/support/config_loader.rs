//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;
use tether_config::Config;

use crate::bootstrap::ConfigLoader;

/// Configuration binding an ephemeral loopback port with fast timings.
#[must_use]
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        drain_interval_ms: 5,
        start_timeout_ms: 2_000,
        stop_timeout_ms: 2_000,
        status_interval_ticks: 10,
        log_filter: "warn".to_owned(),
        ..Config::default()
    }
}

/// Loader returning [`test_config`], optionally adjusted.
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: test_config(),
        }
    }

    /// Applies `adjust` to the configuration handed out by the loader.
    #[must_use]
    pub fn with(mut self, adjust: impl FnOnce(&mut Config)) -> Self {
        adjust(&mut self.config);
        self
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tetherd"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
