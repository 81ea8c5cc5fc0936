//! Behavioural tests for the server lifecycle and host runtime.

use std::cell::RefCell;

use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use crate::bridge::{CommandError, FIRST_DRAIN_DELAY};
use crate::lifecycle::{ServerState, StartOutcome, StopOutcome};

use super::support::{HealthEvent, HostWorld, request, world};

#[given("a host serving the demo tools")]
fn given_host(world: &RefCell<HostWorld>) {
    world.borrow_mut().build_host(|_| {});
}

#[given("a host serving the demo tools without auto start")]
fn given_host_without_auto_start(world: &RefCell<HostWorld>) {
    world
        .borrow_mut()
        .build_host(|config| config.auto_start = Some(false));
}

#[given("a host whose port is already taken")]
fn given_taken_port(world: &RefCell<HostWorld>) {
    world.borrow_mut().build_host_on_taken_port();
}

#[when("the server is started")]
fn when_started(world: &RefCell<HostWorld>) {
    world.borrow_mut().start();
}

#[when("the server is stopped")]
fn when_stopped(world: &RefCell<HostWorld>) {
    world.borrow_mut().stop();
}

#[when("the host is activated")]
fn when_activated(world: &RefCell<HostWorld>) {
    world.borrow_mut().activate();
}

#[when("the host is deactivated")]
fn when_deactivated(world: &RefCell<HostWorld>) {
    world.borrow_mut().deactivate();
}

#[when("{count} commands are queued")]
fn when_commands_queued(world: &RefCell<HostWorld>, count: usize) {
    world.borrow_mut().queue_commands(count);
}

#[when("a client creates an object named \"{name}\"")]
fn when_client_creates(world: &RefCell<HostWorld>, name: String) {
    let frame = request(1, "create_object", json!({"type": "empty", "name": name}));
    world.borrow_mut().exchange(vec![frame]);
}

#[then("the server is running")]
fn then_running(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    let controller = world.host().controller();
    assert!(controller.is_running(), "server should be running");
    assert_eq!(controller.state(), ServerState::Running);
    assert!(controller.local_addr().is_some());
}

#[then("the server is stopped")]
fn then_stopped(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    let controller = world.host().controller();
    assert!(!controller.is_running(), "server should be stopped");
    assert_eq!(controller.state(), ServerState::Stopped);
    assert_eq!(controller.local_addr(), None);
}

#[then("the start reports the server was already running")]
fn then_already_running(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.start_result(), Ok(StartOutcome::AlreadyRunning)),
        "unexpected start result: {:?}",
        world.start_result()
    );
    assert!(
        world
            .reporter
            .saw(|event| *event == HealthEvent::ServerAlreadyRunning)
    );
}

#[then("the start fails with \"{message}\"")]
fn then_start_fails(world: &RefCell<HostWorld>, message: String) {
    let world = world.borrow();
    let error = match world.start_result() {
        Ok(outcome) => panic!("start succeeded unexpectedly: {outcome:?}"),
        Err(error) => error.to_string(),
    };
    assert!(
        error.starts_with(&message),
        "expected '{message}' in '{error}'"
    );
}

#[then("the stop joined the server thread")]
fn then_stop_joined(world: &RefCell<HostWorld>) {
    assert_eq!(world.borrow().stop_result(), Some(StopOutcome::Joined));
}

#[then("the stop found nothing running")]
fn then_stop_idle(world: &RefCell<HostWorld>) {
    assert_eq!(world.borrow().stop_result(), Some(StopOutcome::NotRunning));
}

#[then("the reporter recorded the server running")]
fn then_reporter_running(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    let addr = world.local_addr();
    let events = world.reporter.events();
    assert!(
        events.contains(&HealthEvent::ServerRunning(addr)),
        "running event missing: {events:?}"
    );
}

#[then("the reporter recorded the start failure")]
fn then_reporter_start_failure(world: &RefCell<HostWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::ServerStartFailed(_))),
        "start failure event missing: {events:?}"
    );
}

#[then("the reporter recorded host activation")]
fn then_reporter_activation(world: &RefCell<HostWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .saw(|event| *event == HealthEvent::HostActivated)
    );
}

#[then("one drain callback is registered")]
fn then_one_callback(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    assert!(world.activation().is_ok(), "activation failed");
    assert!(world.host().is_active());
    assert_eq!(world.timers.len(), 1);
    assert_eq!(world.timers.first_intervals(), &[FIRST_DRAIN_DELAY]);
}

#[then("no drain callback is registered")]
fn then_no_callback(world: &RefCell<HostWorld>) {
    let world = world.borrow();
    assert!(!world.host().is_active());
    assert_eq!(world.timers.len(), 0);
}

#[then("{count} commands were cancelled")]
fn then_cancelled(world: &RefCell<HostWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.cancelled(), Some(count));
    assert!(
        world
            .reporter
            .saw(|event| *event == HealthEvent::HostDeactivated(count))
    );
}

#[then("every queued command resolved with \"{message}\"")]
fn then_queued_resolved(world: &RefCell<HostWorld>, message: String) {
    let outcomes = world.borrow_mut().pending_outcomes();
    assert!(!outcomes.is_empty(), "no commands were queued");
    for outcome in outcomes {
        match outcome {
            Some(Err(error)) => {
                assert_eq!(error, CommandError::ShuttingDown);
                assert_eq!(error.to_string(), message);
            }
            other => panic!("command was not cancelled: {other:?}"),
        }
    }
}

#[then("the client receives a success response for \"{tool}\"")]
fn then_success_response(world: &RefCell<HostWorld>, tool: String) {
    let world = world.borrow();
    let [response] = world.responses() else {
        panic!("expected one response, got {:?}", world.responses());
    };
    assert_eq!(response["status"], "success", "response: {response}");
    assert_eq!(response["tool"], tool.as_str());
    assert_eq!(response["id"], 1);
}

#[then("the response data names the object \"{name}\"")]
fn then_response_names(world: &RefCell<HostWorld>, name: String) {
    let world = world.borrow();
    assert_eq!(world.responses()[0]["data"]["name"], name.as_str());
    assert_eq!(world.responses()[0]["data"]["type"], "EMPTY");
}

#[scenario(
    path = "tests/features/server_lifecycle.feature",
    name = "Starting twice leaves a single running server"
)]
fn starting_twice(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_lifecycle.feature",
    name = "Binding an occupied port reports the failure"
)]
fn binding_occupied_port(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/server_lifecycle.feature",
    name = "Stopping an idle server is a no-op"
)]
fn stopping_idle_server(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/host_runtime.feature",
    name = "Activation installs the drain callback and starts the server"
)]
fn activation_starts_server(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/host_runtime.feature",
    name = "Activation without auto start leaves the server stopped"
)]
fn activation_without_auto_start(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/host_runtime.feature",
    name = "Deactivation cancels queued commands"
)]
fn deactivation_cancels_commands(world: RefCell<HostWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/host_runtime.feature",
    name = "Clients drive host tools through the bridge"
)]
fn clients_drive_tools(world: RefCell<HostWorld>) {
    drop(world);
}
