//! Test support utilities for Tether CLI coverage.
//!
//! Supplies a single-connection fake WebSocket server, a static configuration
//! loader and a scenario world that captures CLI output.

use std::cell::RefCell;
use std::ffi::OsString;
use std::net::TcpListener as StdTcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rstest::fixture;
use serde_json::{Value, json};
use tether_config::Config;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::{AppError, ConfigLoader, run_with_timeout};

/// Connect timeout used by tests so unreachable servers fail fast.
pub(crate) const TEST_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Produces the frames sent back for a recorded request.
pub(crate) type Responder = Box<dyn Fn(&Value) -> Vec<Value> + Send>;

/// Answers with a success envelope carrying `data`.
pub(crate) fn success(data: Value) -> Responder {
    Box::new(move |request| {
        vec![json!({
            "id": request["id"],
            "tool": request["tool"],
            "status": "success",
            "data": data,
        })]
    })
}

/// Answers with an error envelope carrying `message`.
pub(crate) fn failure(message: &str) -> Responder {
    let message = message.to_owned();
    Box::new(move |request| {
        vec![json!({
            "id": request["id"],
            "tool": request["tool"],
            "status": "error",
            "error": message,
        })]
    })
}

/// Sends a response for another request before the real one.
pub(crate) fn stray_then_success(data: Value) -> Responder {
    Box::new(move |request| {
        vec![
            json!({"id": "someone-else", "tool": "ping", "status": "success", "data": {}}),
            json!({
                "id": request["id"],
                "tool": request["tool"],
                "status": "success",
                "data": data,
            }),
        ]
    })
}

/// Closes the connection without answering.
pub(crate) fn silent() -> Responder {
    Box::new(|_| Vec::new())
}

/// Accepts one WebSocket connection, records the first request and replies
/// with whatever the responder produces.
pub(crate) struct FakeServer {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    pub(crate) fn spawn(responder: Responder) -> Self {
        let listener = StdTcpListener::bind(("127.0.0.1", 0)).expect("bind fake server");
        let port = listener.local_addr().expect("local addr").port();
        listener
            .set_nonblocking(true)
            .expect("non-blocking listener");
        let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("fake server runtime");
            runtime.block_on(async move {
                let listener = TcpListener::from_std(listener).expect("tokio listener");
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let Ok(mut socket) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = socket.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let request: Value = serde_json::from_str(&text).expect("request is JSON");
                    let replies = responder(&request);
                    recorded.lock().expect("lock requests").push(request);
                    for reply in replies {
                        if socket.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                    break;
                }
                let _ = socket.close(None).await;
            });
        });
        Self {
            port,
            requests,
            handle: Some(handle),
        }
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the connection to finish and returns the recorded requests.
    pub(crate) fn take_requests(&mut self) -> Vec<Value> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.requests.lock().expect("lock requests").clone()
    }
}

/// Returns a port nothing is listening on.
pub(crate) fn closed_port() -> u16 {
    let listener = StdTcpListener::bind(("127.0.0.1", 0)).expect("bind free port");
    listener.local_addr().expect("free port addr").port()
}

/// Splits a command line the way the scenarios write it.
pub(crate) fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("tether")];
    args.extend(
        command
            .trim()
            .split_whitespace()
            .map(|token| OsString::from(token.trim_matches('"'))),
    );
    args
}

#[derive(Default)]
pub(crate) struct TestWorld {
    pub(crate) config: Config,
    pub(crate) server: Option<FakeServer>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_code: Option<ExitCode>,
    pub(crate) requests: Vec<Value>,
}

impl TestWorld {
    pub(crate) fn start_server(&mut self, responder: Responder) {
        let server = FakeServer::spawn(responder);
        self.config.host = String::from("127.0.0.1");
        self.config.port = server.port();
        self.server = Some(server);
    }

    pub(crate) fn point_at_closed_port(&mut self) {
        self.config.host = String::from("127.0.0.1");
        self.config.port = closed_port();
    }

    pub(crate) fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        let loader = StaticConfigLoader::new(self.config.clone());
        let exit = run_with_timeout(
            build_args(command),
            &mut self.stdout,
            &mut self.stderr,
            &loader,
            TEST_CONNECT_TIMEOUT,
        );
        self.exit_code = Some(exit);
        if let Some(server) = self.server.as_mut() {
            self.requests = server.take_requests();
        }
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub(crate) fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    pub(crate) fn only_request(&self) -> &Value {
        assert_eq!(self.requests.len(), 1, "expected a single request");
        self.requests.first().expect("request recorded")
    }

    pub(crate) fn exit_code(&self) -> ExitCode {
        self.exit_code.expect("exit code recorded")
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
