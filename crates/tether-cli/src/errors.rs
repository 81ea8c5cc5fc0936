//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid --params JSON: {0}")]
    ParseParams(serde_json::Error),
    #[error("--params must be a JSON object")]
    ParamsNotObject,
    #[error("failed to build client runtime: {0}")]
    Runtime(io::Error),
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: Box<tungstenite::Error>,
    },
    #[error("timed out after {timeout:?} connecting to server at {endpoint}")]
    ConnectTimeout { endpoint: String, timeout: Duration },
    #[error("failed to serialise request: {0}")]
    SerialiseRequest(serde_json::Error),
    #[error("failed to send request to server: {0}")]
    SendRequest(Box<tungstenite::Error>),
    #[error("failed to read response from server: {0}")]
    ReadResponse(Box<tungstenite::Error>),
    #[error("failed to parse server message: {0}")]
    ParseMessage(serde_json::Error),
    #[error("server closed the connection before responding")]
    MissingResponse,
    #[error("failed to render response: {0}")]
    RenderResponse(serde_json::Error),
    #[error("failed to write response: {0}")]
    EmitResponse(io::Error),
}
