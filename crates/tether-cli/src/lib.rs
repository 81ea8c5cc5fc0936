//! Command-line client runtime for Tether.
//!
//! The module owns argument parsing, configuration bootstrapping, request
//! construction and the WebSocket exchange. The runner is exercised both from
//! the binary entrypoint and from tests where configuration loading and IO
//! streams can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use tether_protocol::ToolResponse;
use uuid::Uuid;

mod cli;
mod command;
mod config;
mod errors;
mod transport;

use cli::Cli;
use command::build_request;
use config::split_config_arguments;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use transport::{CONNECTION_TIMEOUT, send_request};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the connection and logging fields of
/// `tether_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--auth-token",
    "--log-filter",
    "--log-format",
];

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
    connect_timeout: Duration,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
            connect_timeout: CONNECTION_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let mut cli_arguments: Vec<OsString> = args.first().cloned().into_iter().collect();
        cli_arguments.extend(args.iter().skip(split.command_start).cloned());

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                let id = Uuid::new_v4().to_string();
                let request = build_request(&cli.command, id, config.auth_token())?;
                send_request(&config.endpoint(), &request, self.connect_timeout)
            })
            .and_then(|response| self.emit(&response).map(|()| response));

        match result {
            Ok(response) if response.is_success() => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(error) => self.fail(&error),
        }
    }

    fn emit(&mut self, response: &ToolResponse) -> Result<(), AppError> {
        let rendered =
            serde_json::to_string_pretty(response).map_err(AppError::RenderResponse)?;
        writeln!(self.stdout, "{rendered}").map_err(AppError::EmitResponse)?;
        self.stdout.flush().map_err(AppError::EmitResponse)
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.stderr, "{error}");
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Prints the response envelope as pretty JSON to `stdout` and exits with a
/// failure code when the server answers with an error or cannot be reached.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader).run(args)
}

#[cfg(test)]
pub(crate) fn run_with_timeout<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    connect_timeout: Duration,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader)
        .with_connect_timeout(connect_timeout)
        .run(args)
}

#[cfg(test)]
mod tests;
