//! Error surface for the process entry point.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::lifecycle::LifecycleError;
use crate::registry::RegistrationError;

use super::shutdown::ShutdownError;

/// Errors surfaced by the headless host loop.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// The server could not be started.
    #[error("failed to start server: {source}")]
    Start {
        /// Underlying lifecycle error.
        #[source]
        source: LifecycleError,
    },
}

impl From<LifecycleError> for HeadlessError {
    fn from(source: LifecycleError) -> Self {
        Self::Start { source }
    }
}

/// Errors surfaced while launching the service.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping failed.
    #[error("bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Tool registration failed.
    #[error("tool registration failed: {source}")]
    Registration {
        /// Underlying registration error.
        #[source]
        source: RegistrationError,
    },
    /// Installing the shutdown signal handlers failed.
    #[error("failed to prepare shutdown handling: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The headless loop failed.
    #[error("headless host failed: {source}")]
    Headless {
        /// Underlying headless error.
        #[source]
        source: HeadlessError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<RegistrationError> for LaunchError {
    fn from(source: RegistrationError) -> Self {
        Self::Registration { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<HeadlessError> for LaunchError {
    fn from(source: HeadlessError) -> Self {
        Self::Headless { source }
    }
}
