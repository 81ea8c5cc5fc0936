use thiserror::Error;

/// Errors raised while building the registry at start-up.
///
/// These indicate a wiring mistake in the program rather than a runtime
/// condition, so callers normally abort start-up when they see one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The tool name was empty.
    #[error("tool names must not be empty")]
    EmptyName,
    /// The tool name is answered by the server itself.
    #[error("tool name '{name}' is reserved for a built-in tool")]
    Reserved {
        /// Offending name.
        name: String,
    },
    /// Another handler already uses the name.
    #[error("tool '{name}' is already registered")]
    Duplicate {
        /// Offending name.
        name: String,
    },
}

/// Lookup failure for a tool that is not registered.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown tool: {name}")]
pub struct UnknownTool {
    /// Name that failed to resolve.
    pub name: String,
}
