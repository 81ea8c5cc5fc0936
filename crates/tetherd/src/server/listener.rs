//! Accept loop for the WebSocket server.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tether_config::ServerEndpoint;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::SERVER_TARGET;
use super::connection::{ConnectionCounter, ConnectionSettings, serve_connection};
use super::errors::ServerError;
use super::router::RequestRouter;

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bound WebSocket server, ready to accept connections.
pub struct ProtocolServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: RequestRouter,
    settings: ConnectionSettings,
    counter: ConnectionCounter,
}

impl ProtocolServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound, and
    /// [`ServerError::LocalAddr`] when the bound address cannot be read.
    pub async fn bind(
        endpoint: &ServerEndpoint,
        router: RequestRouter,
        settings: ConnectionSettings,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(endpoint.authority())
            .await
            .map_err(|source| ServerError::Bind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::LocalAddr {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            local_addr,
            router,
            settings,
            counter: ConnectionCounter::default(),
        })
    }

    /// Address the server is listening on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Counter reporting how many connections are open.
    #[must_use]
    pub fn connections(&self) -> ConnectionCounter {
        self.counter.clone()
    }

    /// Accepts connections until `shutdown` becomes true or its sender is
    /// dropped, then waits for every connection to close.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Self {
            listener,
            local_addr,
            router,
            settings,
            counter,
        } = self;
        info!(target: SERVER_TARGET, address = %local_addr, "accepting connections");

        let mut connections = JoinSet::new();
        let mut last_error: Option<io::ErrorKind> = None;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        last_error = None;
                        if let Err(error) = stream.set_nodelay(true) {
                            debug!(target: SERVER_TARGET, %peer, %error, "failed to disable Nagle");
                        }
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            router.clone(),
                            settings,
                            counter.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(error) => {
                        if last_error != Some(error.kind()) {
                            warn!(target: SERVER_TARGET, %error, "failed to accept connection");
                            last_error = Some(error.kind());
                        }
                        time::sleep(ERROR_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next() => {
                    if let Err(join_error) = joined
                        && join_error.is_panic()
                    {
                        error!(target: SERVER_TARGET, "connection task panicked");
                    }
                }
            }
        }

        drop(listener);
        info!(
            target: SERVER_TARGET,
            open = counter.open(),
            "listener stopped; waiting for connections to close"
        );
        while connections.join_next().await.is_some() {}
        info!(target: SERVER_TARGET, "server stopped");
    }
}
