//! Errors raised while talking to the daemon.
//!
//! Transport and protocol failures are surfaced as-is and never retried.
//! Errors reported by the daemon itself arrive as [`ErrorReport`] frames and
//! map one-to-one onto [`IpcError::Validation`] or [`IpcError::Daemon`].

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind the daemon uses for rejected input.
pub const INVALID_ARGUMENT: &str = "invalid-argument";

/// Errors produced by a daemon exchange.
#[derive(Debug, Error)]
pub enum IpcError {
    /// The daemon socket could not be reached.
    #[error("failed to connect to daemon socket {path}: {source}")]
    Connect {
        /// Socket path that was dialled.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The transport failed while sending or receiving a frame.
    #[error("daemon connection failed: {0}")]
    Io(#[source] io::Error),

    /// No terminal reply arrived before the deadline.
    #[error("timed out after {timeout_ms}ms waiting for the daemon reply")]
    Timeout {
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The connection was shut down by an earlier failure.
    #[error("daemon connection is closed")]
    Closed,

    /// The command could not be encoded as JSON.
    #[error("failed to serialise command: {0}")]
    SerialiseCommand(#[source] serde_json::Error),

    /// The peer violated the framing or envelope rules.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The daemon rejected the request as invalid input.
    #[error("invalid argument: {message}")]
    Validation {
        /// Message supplied by the daemon.
        message: String,
    },

    /// The daemon failed the request for any other reason.
    #[error("daemon error ({kind}): {message}")]
    Daemon {
        /// Daemon error kind, for example `not-found`.
        kind: String,
        /// Message supplied by the daemon.
        message: String,
    },

    /// Client and daemon disagree about the protocol.
    #[error("bug: {message}")]
    Bug {
        /// Description of the mismatch.
        message: String,
    },
}

impl IpcError {
    /// Returns true when the daemon rejected the request as invalid input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the daemon-reported error kind, if this error came from the daemon.
    #[must_use]
    pub fn daemon_kind(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => Some(INVALID_ARGUMENT),
            Self::Daemon { kind, .. } => Some(kind.as_str()),
            _ => None,
        }
    }

    /// Returns true for errors carried by a terminal daemon frame.
    ///
    /// These leave the connection aligned on a frame boundary, so it stays
    /// usable for the next command.
    #[must_use]
    pub const fn is_daemon_report(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Daemon { .. })
    }

    /// Returns true when the failure indicates the daemon is not listening.
    #[must_use]
    pub fn is_daemon_unavailable(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotFound
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

/// Framing and envelope violations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The daemon closed the connection before sending any reply byte.
    #[error("empty-reply: daemon closed the connection without replying")]
    EmptyReply,

    /// A frame exceeded the configured size limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge {
        /// Size of the offending body.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// A frame body was not UTF-8.
    #[error("message body is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// A frame body was not JSON.
    #[error("message body is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// The JSON was not a `{kind, data}` envelope.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope.
        reason: String,
    },

    /// The `data` of an error or log frame did not match its kind.
    #[error("malformed '{kind}' message: {source}")]
    MalformedData {
        /// Envelope kind being decoded.
        kind: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The reply payload did not have the shape the command expects.
    #[error("unexpected reply payload: {0}")]
    UnexpectedPayload(#[source] serde_json::Error),
}

/// Body of an inbound `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Open error taxonomy, for example `invalid-argument`.
    pub kind: String,
    /// Human-readable description.
    #[serde(rename = "msg")]
    pub message: String,
}

impl From<ErrorReport> for IpcError {
    fn from(report: ErrorReport) -> Self {
        if report.kind == INVALID_ARGUMENT {
            Self::Validation {
                message: report.message,
            }
        } else {
            Self::Daemon {
                kind: report.kind,
                message: report.message,
            }
        }
    }
}
