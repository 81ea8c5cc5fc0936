//! WebSocket transport for the Tether CLI.
//!
//! A single request is sent over a fresh connection and the first response
//! echoing its id is returned. A `null` id also ends the exchange, since the
//! server uses it for frames it could not attribute. Other ids are skipped.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tether_config::ServerEndpoint;
use tether_protocol::{ToolRequest, ToolResponse};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::AppError;

pub(super) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends `request` to `endpoint` on a throwaway current-thread runtime.
pub(super) fn send_request(
    endpoint: &ServerEndpoint,
    request: &ToolRequest,
    connect_timeout: Duration,
) -> Result<ToolResponse, AppError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    runtime.block_on(exchange(endpoint, request, connect_timeout))
}

async fn exchange(
    endpoint: &ServerEndpoint,
    request: &ToolRequest,
    connect_timeout: Duration,
) -> Result<ToolResponse, AppError> {
    let url = endpoint.to_string();
    let (mut socket, _) = timeout(connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| AppError::ConnectTimeout {
            endpoint: url.clone(),
            timeout: connect_timeout,
        })?
        .map_err(|source| AppError::Connect {
            endpoint: url.clone(),
            source: Box::new(source),
        })?;

    let frame = serde_json::to_string(request).map_err(AppError::SerialiseRequest)?;
    socket
        .send(Message::Text(frame))
        .await
        .map_err(|error| AppError::SendRequest(Box::new(error)))?;

    let outcome = loop {
        let Some(message) = socket.next().await else {
            break Err(AppError::MissingResponse);
        };
        match message.map_err(|error| AppError::ReadResponse(Box::new(error)))? {
            Message::Text(text) => {
                let response: ToolResponse =
                    serde_json::from_str(&text).map_err(AppError::ParseMessage)?;
                if response.id == request.id || response.id.is_null() {
                    break Ok(response);
                }
            }
            Message::Close(_) => break Err(AppError::MissingResponse),
            _ => {}
        }
    };

    let _ = socket.close(None).await;
    outcome
}
