use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;

/// Abstraction over shutdown notification mechanisms.
///
/// The headless loop polls [`ShutdownSignal::requested`] between drain
/// ticks, so implementations must answer without blocking.
pub trait ShutdownSignal {
    /// Returns true once shutdown should proceed.
    fn requested(&self) -> bool;
}

impl ShutdownSignal for AtomicBool {
    fn requested(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener raised by `SIGINT` or `SIGTERM`.
#[derive(Debug, Clone)]
pub struct SystemShutdownSignal {
    raised: Arc<AtomicBool>,
}

impl SystemShutdownSignal {
    /// Installs handlers for the termination signals.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when a handler cannot be
    /// registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let raised = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            flag::register(signal, Arc::clone(&raised))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        Ok(Self { raised })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn requested(&self) -> bool {
        self.raised.requested()
    }
}
