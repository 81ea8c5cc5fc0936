//! Per-connection WebSocket loop.

use std::collections::HashMap;
use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tether_config::Config;
use tether_protocol::ToolResponse;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{WebSocketStream, accept_async_with_config};
use tracing::{debug, error, info, warn};

use super::SERVER_TARGET;
use super::router::RequestRouter;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Transport limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Period between keepalive pings. Zero disables keepalive.
    pub keepalive_interval: Duration,
    /// Time the client has to answer a ping before the connection is closed.
    /// Zero disables keepalive.
    pub keepalive_timeout: Duration,
    /// Largest accepted inbound message.
    pub max_message_bytes: usize,
}

impl ConnectionSettings {
    /// Extracts connection limits from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            keepalive_interval: config.keepalive_interval(),
            keepalive_timeout: config.keepalive_timeout(),
            max_message_bytes: config.max_message_bytes,
        }
    }

    /// Ping timer for one connection, or `None` when keepalive is disabled or
    /// the first tick lies beyond what the clock can represent.
    fn keepalive_timer(&self) -> Option<Interval> {
        if self.keepalive_interval.is_zero() || self.keepalive_timeout.is_zero() {
            return None;
        }
        let first = Instant::now().checked_add(self.keepalive_interval)?;
        let mut timer = time::interval_at(first, self.keepalive_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(timer)
    }

    fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            max_message_size: Some(self.max_message_bytes),
            max_frame_size: Some(self.max_message_bytes),
            ..WebSocketConfig::default()
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Counts open connections for introspection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionCounter {
    open: Arc<AtomicUsize>,
}

impl ConnectionCounter {
    /// Number of connections currently open.
    #[must_use]
    pub fn open(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    fn enter(&self) -> ConnectionGuard {
        self.open.fetch_add(1, Ordering::AcqRel);
        ConnectionGuard {
            open: Arc::clone(&self.open),
        }
    }
}

struct ConnectionGuard {
    open: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Request ids a connection has dispatched and not yet answered.
#[derive(Debug, Default)]
struct InFlight {
    requests: HashMap<String, usize>,
}

impl InFlight {
    fn begin(&mut self, key: String) {
        *self.requests.entry(key).or_default() += 1;
    }

    fn complete(&mut self, key: &str) {
        if let Some(count) = self.requests.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.requests.remove(key);
            }
        }
    }

    fn len(&self) -> usize {
        self.requests.values().sum()
    }
}

struct Outbound {
    key: Option<String>,
    response: ToolResponse,
}

enum Closed {
    ByClient,
    Shutdown,
    KeepaliveTimeout,
    Transport(WsError),
}

/// Connection state shared by the loop helpers.
struct Session {
    peer: SocketAddr,
    router: RequestRouter,
    outbound: mpsc::UnboundedSender<Outbound>,
    requests: JoinSet<()>,
    in_flight: InFlight,
}

impl Session {
    fn accept(&mut self, frame: &str) {
        match self.router.parse(frame) {
            Err(response) => self.reply(None, response),
            Ok(envelope) => {
                let key = envelope.request_key();
                self.in_flight.begin(key.clone());
                let router = self.router.clone();
                let outbound = self.outbound.clone();
                let peer = self.peer;
                self.requests.spawn(async move {
                    let response = router.dispatch(envelope).await;
                    if outbound
                        .send(Outbound {
                            key: Some(key),
                            response,
                        })
                        .is_err()
                    {
                        debug!(target: SERVER_TARGET, %peer, "connection closed before reply");
                    }
                });
            }
        }
    }

    fn reply(&self, key: Option<String>, response: ToolResponse) {
        if self.outbound.send(Outbound { key, response }).is_err() {
            debug!(target: SERVER_TARGET, peer = %self.peer, "connection closed before reply");
        }
    }
}

/// Serves one client until it disconnects, misses a keepalive, or the server
/// shuts down.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: RequestRouter,
    settings: ConnectionSettings,
    counter: ConnectionCounter,
    mut shutdown: watch::Receiver<bool>,
) {
    let _guard = counter.enter();
    let socket = match accept_async_with_config(stream, Some(settings.websocket_config())).await {
        Ok(socket) => socket,
        Err(error) => {
            warn!(target: SERVER_TARGET, %peer, %error, "websocket handshake failed");
            return;
        }
    };
    info!(target: SERVER_TARGET, %peer, "client connected");

    let (mut sink, mut incoming) = socket.split();
    let (outbound, mut replies) = mpsc::unbounded_channel();
    let mut session = Session {
        peer,
        router,
        outbound,
        requests: JoinSet::new(),
        in_flight: InFlight::default(),
    };
    let mut keepalive = settings.keepalive_timer();
    let mut pong_deadline: Option<Instant> = None;

    let closed = loop {
        if *shutdown.borrow() {
            break Closed::Shutdown;
        }
        let deadline = pong_deadline;
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break Closed::Shutdown;
                }
            }
            frame = incoming.next() => {
                pong_deadline = None;
                match frame {
                    None | Some(Ok(Message::Close(_))) => break Closed::ByClient,
                    Some(Err(error)) => break Closed::Transport(error),
                    Some(Ok(Message::Text(text))) => session.accept(&text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => session.accept(&text),
                        Err(_) => session.reply(None, ToolResponse::protocol_error("Invalid JSON")),
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                }
            }
            Some(Outbound { key, response }) = replies.recv() => {
                if let Some(key) = key {
                    session.in_flight.complete(&key);
                }
                if let Err(error) = send_response(&mut sink, &response).await {
                    break Closed::Transport(error);
                }
            }
            () = tick(keepalive.as_mut()) => {
                if pong_deadline.is_none() {
                    if let Err(error) = sink.send(Message::Ping(Vec::new())).await {
                        break Closed::Transport(error);
                    }
                    pong_deadline = Instant::now().checked_add(settings.keepalive_timeout);
                }
            }
            () = expire(deadline) => break Closed::KeepaliveTimeout,
            Some(joined) = session.requests.join_next() => {
                if let Err(join_error) = joined
                    && let Some(response) = panicked_request(&join_error)
                {
                    error!(target: SERVER_TARGET, %peer, "request task panicked");
                    session.reply(None, response);
                }
            }
        }
    };

    let outstanding = session.in_flight.len();
    session.requests.abort_all();
    match closed {
        Closed::ByClient => info!(target: SERVER_TARGET, %peer, outstanding, "client disconnected"),
        Closed::Shutdown => info!(target: SERVER_TARGET, %peer, outstanding, "closing connection for shutdown"),
        Closed::KeepaliveTimeout => warn!(target: SERVER_TARGET, %peer, outstanding, "client missed keepalive; closing"),
        Closed::Transport(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
            debug!(target: SERVER_TARGET, %peer, outstanding, "connection already closed");
            return;
        }
        Closed::Transport(error) => {
            warn!(target: SERVER_TARGET, %peer, %error, outstanding, "connection failed");
            return;
        }
    }
    if let Err(error) = sink.close().await {
        debug!(target: SERVER_TARGET, %peer, %error, "failed to close websocket cleanly");
    }
}

async fn tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn server_error(detail: impl std::fmt::Display) -> ToolResponse {
    ToolResponse::protocol_error(format!("Server error: {detail}"))
}

/// Answer owed to the client when a request task died instead of replying.
fn panicked_request(join_error: &JoinError) -> Option<ToolResponse> {
    join_error
        .is_panic()
        .then(|| server_error("request handling panicked"))
}

fn encode_response(response: &ToolResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        error!(target: SERVER_TARGET, %error, "failed to serialise response");
        serde_json::json!({
            "id": null,
            "tool": null,
            "status": "error",
            "error": format!("Server error: {error}"),
        })
        .to_string()
    })
}

async fn send_response(sink: &mut Sink, response: &ToolResponse) -> Result<(), WsError> {
    sink.send(Message::Text(encode_response(response))).await
}
