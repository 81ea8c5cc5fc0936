//! Request validation and routing.
//!
//! Every inbound frame goes through [`RequestRouter::parse`], which applies
//! the checks that can be answered without touching the host: envelope shape,
//! request id, auth token and parameter shape. Frames that pass become an
//! [`Envelope`] handed to [`RequestRouter::dispatch`], which answers the
//! built-in tools directly and forwards everything else through the bridge.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tether_protocol::{LIST_TOOLS, PING, ParamMap, PingData, ToolList, ToolResponse};
use tokio::time;
use tracing::{debug, warn};

use super::{SERVER_TARGET, SERVER_VERSION};
use crate::bridge::{BridgeError, BridgeHandle};
use crate::registry::ToolRegistry;

const INVALID_JSON: &str = "Invalid JSON";
const INVALID_ENVELOPE: &str = "Invalid request: expected a JSON object";
const MISSING_ID: &str = "Missing request id";
const MISSING_TOOL: &str = "Missing tool name";
const INVALID_PARAMS: &str = "Invalid params: expected a JSON object";
const UNAUTHORIZED: &str = "Unauthorized - invalid token";
const SHUTTING_DOWN: &str = "Server shutting down";

/// A validated request ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Request id echoed in the response.
    pub id: Value,
    /// Requested tool.
    pub tool: String,
    /// Tool parameters.
    pub params: ParamMap,
}

impl Envelope {
    /// Key identifying the request among a connection's in-flight requests.
    #[must_use]
    pub fn request_key(&self) -> String {
        self.id.to_string()
    }
}

/// Routes request frames to built-in tools or the bridge.
#[derive(Clone)]
pub struct RequestRouter {
    registry: Arc<ToolRegistry>,
    bridge: BridgeHandle,
    auth_token: Option<Arc<str>>,
    command_timeout: Option<Duration>,
}

impl RequestRouter {
    /// Builds a router. An empty `auth_token` disables authentication.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, bridge: BridgeHandle, auth_token: Option<&str>) -> Self {
        Self {
            registry,
            bridge,
            auth_token: auth_token.filter(|token| !token.is_empty()).map(Arc::from),
            command_timeout: None,
        }
    }

    /// Limits how long a request waits for its bridge outcome.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Parses and validates `frame`, then dispatches it.
    pub async fn route(&self, frame: &str) -> ToolResponse {
        match self.parse(frame) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(response) => response,
        }
    }

    /// Validates a frame without dispatching it.
    ///
    /// # Errors
    ///
    /// Returns the response to send back when the frame is rejected. Checks
    /// run in order: JSON shape, request id, auth token, tool name, params.
    pub fn parse(&self, frame: &str) -> Result<Envelope, ToolResponse> {
        let Ok(decoded) = serde_json::from_str::<Value>(frame) else {
            return Err(ToolResponse::protocol_error(INVALID_JSON));
        };
        let Value::Object(mut fields) = decoded else {
            return Err(ToolResponse::protocol_error(INVALID_ENVELOPE));
        };

        let tool = fields.remove("tool").unwrap_or(Value::Null);
        let id = match fields.remove("id") {
            None | Some(Value::Null) => {
                return Err(ToolResponse::error(Value::Null, tool, MISSING_ID));
            }
            Some(id) => id,
        };

        if !self.is_authorised(&fields) {
            warn!(target: SERVER_TARGET, request_id = %id, "rejected request with invalid token");
            return Err(ToolResponse::error(id, tool, UNAUTHORIZED));
        }

        let tool = match tool {
            Value::String(name) => name,
            other => return Err(ToolResponse::error(id, other, MISSING_TOOL)),
        };

        let params = match fields.remove("params") {
            None | Some(Value::Null) => ParamMap::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(ToolResponse::error(id, Value::String(tool), INVALID_PARAMS)),
        };

        Ok(Envelope { id, tool, params })
    }

    /// Answers a validated request.
    pub async fn dispatch(&self, envelope: Envelope) -> ToolResponse {
        let Envelope { id, tool, params } = envelope;
        match tool.as_str() {
            PING => self.ping(id),
            LIST_TOOLS => self.list_tools(id),
            _ => self.call(id, tool, params).await,
        }
    }

    /// Number of registered tools.
    #[must_use]
    pub fn tools_available(&self) -> usize {
        self.registry.len()
    }

    fn is_authorised(&self, fields: &Map<String, Value>) -> bool {
        let Some(expected) = self.auth_token.as_deref() else {
            return true;
        };
        fields.get("token").and_then(Value::as_str) == Some(expected)
    }

    fn ping(&self, id: Value) -> ToolResponse {
        let data = PingData {
            version: SERVER_VERSION.to_owned(),
            timestamp: unix_timestamp(),
            tools: self.registry.list(),
        };
        encode(id, PING, &data)
    }

    fn list_tools(&self, id: Value) -> ToolResponse {
        let data = ToolList {
            tools: self.registry.list(),
        };
        encode(id, LIST_TOOLS, &data)
    }

    async fn call(&self, id: Value, tool: String, params: ParamMap) -> ToolResponse {
        let handler = match self.registry.resolve(&tool) {
            Ok(handler) => handler,
            Err(unknown) => {
                debug!(target: SERVER_TARGET, tool = %tool, "unknown tool requested");
                return ToolResponse::error(id, Value::String(tool), unknown.to_string());
            }
        };

        let pending = match self.bridge.submit(handler, params) {
            Ok(pending) => pending,
            Err(BridgeError::ShutDown) => {
                return ToolResponse::error(id, Value::String(tool), SHUTTING_DOWN);
            }
        };

        let resolution = match self.command_timeout {
            None => pending.await,
            Some(limit) => match time::timeout(limit, pending).await {
                Ok(resolution) => resolution,
                Err(_) => {
                    warn!(
                        target: SERVER_TARGET,
                        tool = %tool,
                        timeout_ms = limit.as_millis(),
                        "command timed out waiting for the host"
                    );
                    return ToolResponse::error(
                        id,
                        Value::String(tool),
                        format!("Command timed out after {} ms", limit.as_millis()),
                    );
                }
            },
        };

        match resolution {
            Ok(data) => ToolResponse::success(id, Value::String(tool), data),
            Err(error) => ToolResponse::error(id, Value::String(tool), error.to_string()),
        }
    }
}

fn encode<T: serde::Serialize>(id: Value, tool: &str, data: &T) -> ToolResponse {
    match serde_json::to_value(data) {
        Ok(value) => ToolResponse::success(id, Value::String(tool.to_owned()), value),
        Err(error) => ToolResponse::error(
            id,
            Value::String(tool.to_owned()),
            format!("Server error: {error}"),
        ),
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}
