//! Wires the production collaborators together.

use std::sync::Arc;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::registry::{RegistrationError, ToolRegistry};
use crate::scene::SceneTools;

use super::errors::LaunchError;
use super::headless::{HeadlessSummary, run_headless};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Registry served by the standalone binary.
///
/// # Errors
///
/// Returns [`RegistrationError`] if the scene toolset collides with a
/// reserved name.
pub fn demo_registry() -> Result<ToolRegistry, RegistrationError> {
    let mut builder = ToolRegistry::builder();
    builder.install(&SceneTools::default())?;
    Ok(builder.build())
}

/// Runs the standalone headless service until `SIGINT` or `SIGTERM`.
///
/// # Errors
///
/// See [`LaunchError`].
pub fn run_service() -> Result<HeadlessSummary, LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    run_service_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &shutdown,
    )
}

/// Runs the headless service with injected collaborators.
///
/// # Errors
///
/// See [`LaunchError`].
pub fn run_service_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<HeadlessSummary, LaunchError> {
    let service = bootstrap_with(loader, reporter)?;
    let host = service.into_host(demo_registry()?);
    Ok(run_headless(&host, shutdown)?)
}
