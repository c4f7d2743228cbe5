//! Error types for the `nmc` runtime.

use std::io;
use std::sync::Arc;

use nm_client::IpcError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Daemon(#[from] IpcError),
    #[error("failed to read desired state from {origin}: {source}")]
    ReadState {
        origin: String,
        #[source]
        source: io::Error,
    },
    #[error("desired state from {origin} is not valid JSON: {source}")]
    ParseState {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to render daemon reply: {0}")]
    RenderReply(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// Extra guidance printed after the error, if any.
    pub(crate) fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Daemon(error) if error.is_daemon_unavailable() => {
                Some("is the daemon running? Use --daemon-socket to point at another socket.")
            }
            _ => None,
        }
    }
}
