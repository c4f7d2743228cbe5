//! Runtime for `nmc`, the command-line client of the network daemon.
//!
//! The runtime splits configuration flags from the subcommand, loads
//! configuration through `ortho_config`, installs the tracing subscriber and
//! executes one command over a fresh daemon connection. IO streams and the
//! configuration loader are injected so tests can drive it in-process.

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::process::ExitCode;

use clap::Parser;
use nm_client::NmClient;
use tracing::debug;

mod commands;
mod config;
mod errors;
mod telemetry;

use commands::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_arguments};
use errors::AppError;

/// Runs `nmc` with the given arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    run_with_loader(args, &OrthoConfigLoader, stdin, stdout, stderr)
}

pub(crate) fn run_with_loader<I, L, R, W, E>(
    args: I,
    loader: &L,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    L: ConfigLoader,
    R: Read,
    W: Write,
    E: Write,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&arguments);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            return match write!(stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    match execute(&cli, &split.config_arguments, loader, stdin, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn execute<L, R, W>(
    cli: &Cli,
    config_arguments: &[OsString],
    loader: &L,
    stdin: &mut R,
    stdout: &mut W,
) -> Result<(), AppError>
where
    L: ConfigLoader,
    R: Read,
    W: Write,
{
    let config = loader.load(config_arguments)?;
    telemetry::initialise(&config)?;
    debug!(
        socket = %config.daemon_socket(),
        timeout_ms = config.timeout_ms,
        command = ?cli.command,
        "running command"
    );
    let mut client = NmClient::from_config(&config)?;
    cli.command.execute(&mut client, stdin, stdout)
}

fn report<E>(stderr: &mut E, error: &AppError) -> ExitCode
where
    E: Write,
{
    let mut written = writeln!(stderr, "nmc: {error}");
    if let Some(hint) = error.hint() {
        written = written.and_then(|()| writeln!(stderr, "hint: {hint}"));
    }
    if let Err(write_error) = written
        && write_error.kind() != ErrorKind::BrokenPipe
    {
        debug!(error = %write_error, "failed to report error");
    }
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests;
