//! WebSocket client used by end-to-end tests.
//!
//! The client runs on its own thread and runtime while the calling thread
//! plays the host and drains the bridge, mirroring a real deployment.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::host::Host;

const EXCHANGE_DEADLINE: Duration = Duration::from_secs(10);

/// Builds a request frame.
#[must_use]
pub fn request(id: u64, tool: &str, params: Value) -> String {
    json!({"id": id, "tool": tool, "params": params}).to_string()
}

/// Sends `frames` to `addr` and drains `host` until one response per frame
/// has arrived. Responses are returned in arrival order.
pub fn exchange_while_draining(host: &Host, addr: SocketAddr, frames: Vec<String>) -> Vec<Value> {
    let expected = frames.len();
    let client = thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("client runtime");
        runtime.block_on(async move {
            let (mut socket, _) = connect_async(format!("ws://{addr}"))
                .await
                .expect("client connects");
            for frame in frames {
                socket.send(Message::Text(frame)).await.expect("frame sent");
            }
            let mut responses = Vec::with_capacity(expected);
            while responses.len() < expected {
                let message = socket
                    .next()
                    .await
                    .expect("connection stays open")
                    .expect("frame received");
                if let Message::Text(text) = message {
                    responses.push(serde_json::from_str(&text).expect("response is JSON"));
                }
            }
            let _ = socket.close(None).await;
            responses
        })
    });

    let deadline = Instant::now() + EXCHANGE_DEADLINE;
    while !client.is_finished() {
        assert!(Instant::now() < deadline, "client exchange timed out");
        host.drain_tick();
        thread::sleep(Duration::from_millis(2));
    }
    client.join().expect("client thread panicked")
}
