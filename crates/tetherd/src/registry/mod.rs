//! Tool registry mapping names to host-context handlers.
//!
//! The registry is assembled once during start-up through a
//! [`RegistryBuilder`] and frozen into an immutable [`ToolRegistry`]. After
//! that point it is shared behind an [`Arc`] and read concurrently by every
//! connection without locking. Registration order is preserved so
//! `list_tools` answers are stable.

mod errors;
mod handler;
pub mod params;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tether_protocol::{LIST_TOOLS, ParamMap, PING};

pub use errors::{RegistrationError, UnknownTool};
pub use handler::{CommandOutcome, ToolFailure, ToolHandler, handler};

const NO_DOCUMENTATION: &str = "No documentation";

/// A single tool awaiting registration.
pub struct ToolSpec {
    name: String,
    handler: ToolHandler,
    description: Option<String>,
    module: Option<String>,
}

impl ToolSpec {
    /// Pairs a tool name with its handler.
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&ParamMap) -> CommandOutcome + Send + Sync + 'static,
    {
        Self::from_handler(name, handler(function))
    }

    /// Pairs a tool name with an existing shared handler.
    pub fn from_handler(name: impl Into<String>, handler: ToolHandler) -> Self {
        Self {
            name: name.into(),
            handler,
            description: None,
            module: None,
        }
    }

    /// Attaches a one-line description reported by [`ToolRegistry::describe`].
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Records the module that contributed the tool.
    #[must_use]
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

/// A group of related tools registered together.
pub trait ToolModule {
    /// Module name recorded against every tool it contributes.
    fn name(&self) -> &str;

    /// Tools contributed by the module, in the order they should be listed.
    fn tools(&self) -> Vec<ToolSpec>;
}

/// Metadata describing a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Description, or "No documentation".
    pub doc: String,
    /// Contributing module, when known.
    pub module: Option<String>,
}

struct ToolEntry {
    name: String,
    handler: ToolHandler,
    description: Option<String>,
    module: Option<String>,
}

/// Start-up builder enforcing unique, non-reserved tool names.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when the name is empty, reserved for a
    /// built-in tool, or already registered. The existing entry is never
    /// replaced.
    pub fn register(&mut self, spec: ToolSpec) -> Result<&mut Self, RegistrationError> {
        let ToolSpec {
            name,
            handler,
            description,
            module,
        } = spec;

        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if name == PING || name == LIST_TOOLS {
            return Err(RegistrationError::Reserved { name });
        }
        if self.index.contains_key(&name) {
            return Err(RegistrationError::Duplicate { name });
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(ToolEntry {
            name,
            handler,
            description,
            module,
        });
        Ok(self)
    }

    /// Registers a closure under `name` without metadata.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        function: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&ParamMap) -> CommandOutcome + Send + Sync + 'static,
    {
        self.register(ToolSpec::new(name, function))
    }

    /// Registers every tool contributed by `module`.
    ///
    /// Tools that do not name a module are attributed to `module.name()`.
    ///
    /// # Errors
    ///
    /// Stops at the first rejected tool; earlier tools from the module stay
    /// registered.
    pub fn install(&mut self, module: &dyn ToolModule) -> Result<&mut Self, RegistrationError> {
        for mut spec in module.tools() {
            if spec.module.is_none() {
                spec.module = Some(module.name().to_owned());
            }
            self.register(spec)?;
        }
        Ok(self)
    }

    /// Freezes the builder into an immutable registry.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable name-to-handler mapping.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Starts a new registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    /// Looks up the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTool`] when nothing is registered under `name`. Names
    /// are case-sensitive.
    pub fn resolve(&self, name: &str) -> Result<ToolHandler, UnknownTool> {
        self.entry(name)
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| UnknownTool {
                name: name.to_owned(),
            })
    }

    /// Registered tool names in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Metadata for a single tool.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<ToolInfo> {
        self.entry(name).map(|entry| ToolInfo {
            name: entry.name.clone(),
            doc: entry
                .description
                .clone()
                .unwrap_or_else(|| NO_DOCUMENTATION.to_owned()),
            module: entry.module.clone(),
        })
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&ToolEntry> {
        self.index
            .get(name)
            .and_then(|position| self.entries.get(*position))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}
