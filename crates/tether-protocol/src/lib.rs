//! Wire envelopes exchanged between Tether clients and the server.
//!
//! Every request travels as one JSON text frame:
//!
//! ```json
//! { "id": "req-1", "tool": "create_object", "params": { "name": "Cube" }, "token": "secret" }
//! ```
//!
//! and is answered by exactly one response echoing its `id` and `tool`:
//!
//! ```json
//! { "id": "req-1", "tool": "create_object", "status": "success", "data": { "name": "Cube" } }
//! ```
//!
//! A response carries `data` on success and `error` on failure, never both.
//! Protocol-level failures that cannot be tied to a request (for example a
//! frame that is not JSON) use a `null` id and a `null` tool.
//!
//! The built-in `ping` and `list_tools` tools follow the same shape: their
//! payloads ([`PingData`], [`ToolList`]) sit under `data`. Clients that read
//! `version`, `timestamp` or `tools` as top-level response fields are not
//! wire compatible with this envelope and must read them from `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter bag passed to tool handlers.
pub type ParamMap = Map<String, Value>;

/// Built-in tool answering with the server version, a timestamp and the
/// registered tool names.
pub const PING: &str = "ping";

/// Built-in tool answering with the registered tool names.
pub const LIST_TOOLS: &str = "list_tools";

/// Request envelope sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Opaque identifier echoed in the response.
    pub id: Value,
    /// Name of the tool to invoke.
    pub tool: String,
    /// Tool parameters.
    #[serde(default)]
    pub params: ParamMap,
    /// Shared secret, required when the server is configured with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ToolRequest {
    /// Builds a request with empty parameters and no token.
    #[must_use]
    pub fn new(id: impl Into<Value>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            params: ParamMap::new(),
            token: None,
        }
    }

    /// Replaces the request parameters.
    #[must_use]
    pub fn with_params(mut self, params: ParamMap) -> Self {
        self.params = params;
        self
    }

    /// Attaches an auth token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Outcome marker carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The request completed and `data` holds its payload.
    Success,
    /// The request failed and `error` holds the reason.
    Error,
}

/// Response envelope sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Echo of the request id, or `null` when the request could not be read.
    pub id: Value,
    /// Echo of the requested tool, or `null` for protocol-level failures.
    pub tool: Value,
    /// Whether the request succeeded.
    pub status: Status,
    /// Result payload, present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure description, present only on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    /// Builds a success response carrying `data`.
    #[must_use]
    pub const fn success(id: Value, tool: Value, data: Value) -> Self {
        Self {
            id,
            tool,
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// Builds an error response carrying `message`.
    #[must_use]
    pub fn error(id: Value, tool: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            tool,
            status: Status::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Builds an error response that cannot be tied to any request.
    #[must_use]
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::error(Value::Null, Value::Null, message)
    }

    /// Returns true when the status is [`Status::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Failure description, when the response is an error.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Payload of a successful `ping` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingData {
    /// Server version string.
    pub version: String,
    /// Seconds since the Unix epoch when the ping was answered.
    pub timestamp: f64,
    /// Registered tool names in registration order.
    pub tools: Vec<String>,
}

/// Payload of a successful `list_tools` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolList {
    /// Registered tool names in registration order.
    pub tools: Vec<String>,
}
