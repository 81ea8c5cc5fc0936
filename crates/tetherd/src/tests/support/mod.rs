//! Test harness utilities shared by the unit and behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod timers;
#[path = "world.rs"]
mod host_world;

pub use client::{exchange_while_draining, request};
pub use config_loader::{FailingConfigLoader, TestConfigLoader, test_config};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use timers::ManualTimers;
pub use host_world::{HostWorld, world};
