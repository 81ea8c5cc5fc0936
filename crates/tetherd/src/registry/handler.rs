//! Handler contract shared by every registered tool.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tether_protocol::ParamMap;

/// Structured failure returned by a tool handler.
///
/// The `kind` names the failure class (for example `InvalidParams` or
/// `NotFound`) and `message` describes the specific problem. Responses render
/// the pair as `kind: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    kind: String,
    message: String,
}

impl ToolFailure {
    /// Failure kind used for malformed or missing parameters.
    pub const INVALID_PARAMS: &'static str = "InvalidParams";
    /// Failure kind used when a handler cannot find the object it targets.
    pub const NOT_FOUND: &'static str = "NotFound";
    /// Failure kind used when a handler panicked.
    pub const PANIC: &'static str = "Panic";

    /// Builds a failure from an explicit kind and message.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Builds an [`INVALID_PARAMS`](Self::INVALID_PARAMS) failure.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// Builds a [`NOT_FOUND`](Self::NOT_FOUND) failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Self::NOT_FOUND, message)
    }

    /// Builds a [`PANIC`](Self::PANIC) failure.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(Self::PANIC, message)
    }

    /// Failure class.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolFailure {}

/// Result produced by a tool handler.
pub type CommandOutcome = Result<Value, ToolFailure>;

/// Shared, immutable tool handler.
///
/// Handlers run only on the host context and never overlap, so they may
/// assume exclusive access to host state for the duration of a call. They
/// must return synchronously and must not spawn background work.
pub type ToolHandler = Arc<dyn Fn(&ParamMap) -> CommandOutcome + Send + Sync>;

/// Wraps a closure as a [`ToolHandler`].
pub fn handler<F>(function: F) -> ToolHandler
where
    F: Fn(&ParamMap) -> CommandOutcome + Send + Sync + 'static,
{
    Arc::new(function)
}
