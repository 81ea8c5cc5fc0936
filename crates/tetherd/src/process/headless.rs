//! Headless host loop.
//!
//! Without an interactive host there is no recurring-callback facility, so
//! this loop drains the bridge itself at the configured cadence.

use std::thread;

use tracing::info;

use crate::host::Host;
use crate::lifecycle::StopOutcome;

use super::HEADLESS_TARGET;
use super::errors::HeadlessError;
use super::shutdown::ShutdownSignal;

/// Totals reported when the headless loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessSummary {
    /// Drain ticks performed.
    pub ticks: u64,
    /// Commands executed across all ticks.
    pub processed: usize,
    /// Commands cancelled when the bridge shut down.
    pub cancelled: usize,
    /// How the server stopped.
    pub stop: StopOutcome,
}

/// Runs `host` until `shutdown` is requested.
///
/// Starts the server when it is not already running, then drains the bridge
/// every `drain_interval_ms`, logging a status line every
/// `status_interval_ticks` ticks. On shutdown the server is stopped and the
/// bridge is closed, cancelling anything still queued.
///
/// # Errors
///
/// Returns [`HeadlessError::Start`] when the server cannot be started.
pub fn run_headless(
    host: &Host,
    shutdown: &dyn ShutdownSignal,
) -> Result<HeadlessSummary, HeadlessError> {
    if !host.controller().is_running() {
        host.start_server()?;
    }
    let config = host.config();
    let interval = config.drain_interval();
    let status_every = config.status_interval_ticks.max(1);
    info!(
        target: HEADLESS_TARGET,
        endpoint = %config.endpoint(),
        tools = host.registry().len(),
        interval_ms = interval.as_millis(),
        "headless host running"
    );

    let mut ticks: u64 = 0;
    let mut processed = 0;
    while !shutdown.requested() {
        processed += host.drain_tick().processed;
        ticks += 1;
        if ticks % status_every == 0 {
            let status = host.controller().info();
            info!(
                target: HEADLESS_TARGET,
                running = status.running,
                queue_size = status.queue_size,
                connections = status.connections,
                "status"
            );
        }
        thread::sleep(interval);
    }

    info!(target: HEADLESS_TARGET, ticks, processed, "shutdown requested");
    let stop = host.stop_server();
    let cancelled = host.bridge().shutdown();
    info!(target: HEADLESS_TARGET, cancelled, "headless host stopped");
    Ok(HeadlessSummary {
        ticks,
        processed,
        cancelled,
        stop,
    })
}
