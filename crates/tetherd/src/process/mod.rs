//! Process entry point and the headless host loop.

mod errors;
mod headless;
mod launch;
mod shutdown;

pub use errors::{HeadlessError, LaunchError};
pub use headless::{HeadlessSummary, run_headless};
pub use launch::{demo_registry, run_service, run_service_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const HEADLESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::headless");
