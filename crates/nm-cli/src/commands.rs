//! Subcommands of `nmc` and their execution against the daemon.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use nm_client::{ApplyOptions, NmClient, QueryOptions};
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

/// Path argument that selects standard input.
const STDIN_MARKER: &str = "-";

/// Talk to the network-configuration daemon.
///
/// Configuration flags (`--daemon-socket`, `--timeout-ms`, ...) must come
/// before the subcommand.
#[derive(Debug, Parser)]
#[command(name = "nmc", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum CliCommand {
    /// Check that the daemon answers.
    Ping,
    /// Print the network state as JSON.
    Show {
        /// Read the saved state instead of the running one.
        #[arg(long)]
        saved: bool,
    },
    /// Apply a desired state document.
    Apply {
        /// JSON document to apply, or `-` for standard input.
        file: PathBuf,
        /// Skip verification after applying.
        #[arg(long)]
        no_verify: bool,
    },
}

impl CliCommand {
    /// Runs the command on `client`, writing the result to `stdout`.
    pub(crate) fn execute<R, W>(
        &self,
        client: &mut NmClient,
        stdin: &mut R,
        stdout: &mut W,
    ) -> Result<(), AppError>
    where
        R: Read,
        W: Write,
    {
        match self {
            Self::Ping => {
                let reply = client.ping()?;
                writeln!(stdout, "{reply}").map_err(AppError::WriteOutput)
            }
            Self::Show { saved } => {
                let options = if *saved {
                    QueryOptions::saved()
                } else {
                    QueryOptions::running()
                };
                let state: Value = client.query_network_state(options)?;
                render(stdout, &state)
            }
            Self::Apply { file, no_verify } => {
                let state = read_state(file, stdin)?;
                let options = ApplyOptions::default().with_no_verify(*no_verify);
                debug!(no_verify, "applying desired state");
                let confirmation = client.apply_network_state(&state, options)?;
                if confirmation.is_null() {
                    Ok(())
                } else {
                    render(stdout, &confirmation)
                }
            }
        }
    }
}

fn read_state<R>(file: &Path, stdin: &mut R) -> Result<Value, AppError>
where
    R: Read,
{
    let origin = file.display().to_string();
    let read_error = |source| AppError::ReadState {
        origin: origin.clone(),
        source,
    };
    let text = if file.as_os_str() == STDIN_MARKER {
        let mut buffer = String::new();
        stdin.read_to_string(&mut buffer).map_err(read_error)?;
        buffer
    } else {
        fs::read_to_string(file).map_err(read_error)?
    };
    serde_json::from_str(&text).map_err(|source| AppError::ParseState { origin, source })
}

fn render<W>(stdout: &mut W, value: &Value) -> Result<(), AppError>
where
    W: Write,
{
    let text = serde_json::to_string_pretty(value).map_err(AppError::RenderReply)?;
    writeln!(stdout, "{text}").map_err(AppError::WriteOutput)
}
