//! CLI argument definitions for the Tether client.

use clap::{Parser, Subcommand};

/// Command-line client for a running Tether server.
#[derive(Parser, Debug)]
#[command(name = "tether", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The request to send.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Requests the client knows how to send.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Checks the server is reachable and prints its version and tools.
    Ping,
    /// Prints the names of the registered tools.
    ListTools,
    /// Invokes a tool by name.
    Call {
        /// Registered tool name (for example `get_scene_info`).
        #[arg(value_name = "TOOL")]
        tool: String,
        /// Tool parameters as a JSON object.
        #[arg(long, value_name = "JSON")]
        params: Option<String>,
    },
}
