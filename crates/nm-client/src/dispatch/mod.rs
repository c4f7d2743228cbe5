//! Classification of inbound frames.
//!
//! A request is answered by any number of `log` frames followed by exactly
//! one terminal frame: either an `error` or a payload of any other kind. The
//! [`Dispatcher`] turns each frame into the next [`ExchangeState`]:
//!
//! ```text
//! AwaitingFrame --log--> AwaitingFrame
//! AwaitingFrame --error--> Failed
//! AwaitingFrame --other--> Complete
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::IPC_TARGET;
use crate::error::{ErrorReport, IpcError, ProtocolError};
use crate::log::{LOG_KIND, LogEntry, LogSink};

/// Envelope kind of daemon error reports.
pub const ERROR_KIND: &str = "error";

/// The `{kind, data}` structure carried by every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Tag deciding how `data` is decoded.
    pub kind: String,
    /// Kind-specific payload.
    pub data: Value,
}

impl Envelope {
    /// Parses a frame body into an envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the body is not UTF-8, not JSON, or
    /// not an object with a string `kind` and a `data` member.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(body).map_err(ProtocolError::InvalidUtf8)?;
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::MalformedJson)?;
        let Value::Object(map) = value else {
            return Err(malformed(format!(
                "expected an object with 'kind' and 'data', got: {text}"
            )));
        };
        Self::from_map(map)
    }

    fn from_map(mut map: Map<String, Value>) -> Result<Self, ProtocolError> {
        let kind = match map.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => return Err(malformed(format!("'kind' must be a string, got {other}"))),
            None => return Err(malformed("missing 'kind'".to_owned())),
        };
        let data = map
            .remove("data")
            .ok_or_else(|| malformed(format!("'{kind}' message is missing 'data'")))?;
        Ok(Self { kind, data })
    }
}

fn malformed(reason: String) -> ProtocolError {
    ProtocolError::MalformedEnvelope { reason }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Terminal failure reported by the daemon.
    Error(ErrorReport),
    /// Out-of-band daemon log notification.
    Log(LogEntry),
    /// Terminal successful reply of any other kind.
    Payload {
        /// Reply kind, for example `pong`.
        kind: String,
        /// Reply data handed back to the caller.
        data: Value,
    },
}

impl Message {
    /// Decodes and classifies a frame body.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for malformed envelopes or error/log data and
    /// [`IpcError::Bug`] for log levels this client does not know.
    pub fn from_slice(body: &[u8]) -> Result<Self, IpcError> {
        Self::from_envelope(Envelope::from_slice(body)?)
    }

    /// Classifies an already parsed envelope.
    ///
    /// Unknown top-level kinds are accepted as payloads; the contents of
    /// `error` and `log` envelopes are decoded strictly.
    ///
    /// # Errors
    ///
    /// See [`Message::from_slice`].
    pub fn from_envelope(envelope: Envelope) -> Result<Self, IpcError> {
        let Envelope { kind, data } = envelope;
        if kind == ERROR_KIND {
            let report =
                serde_json::from_value(data).map_err(|source| ProtocolError::MalformedData {
                    kind: ERROR_KIND.to_owned(),
                    source,
                })?;
            Ok(Self::Error(report))
        } else if kind == LOG_KIND {
            LogEntry::from_value(data).map(Self::Log)
        } else {
            Ok(Self::Payload { kind, data })
        }
    }
}

/// Progress of a single request/response exchange.
#[derive(Debug)]
pub enum ExchangeState {
    /// More frames are needed.
    AwaitingFrame,
    /// The exchange ended with a reply payload.
    Complete(Value),
    /// The exchange ended with an error.
    Failed(IpcError),
}

impl ExchangeState {
    /// Returns true once no further frames belong to this exchange.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingFrame)
    }
}

/// Routes the frames of one exchange, forwarding logs to a sink.
pub struct Dispatcher<'a, S: LogSink + ?Sized> {
    sink: &'a mut S,
    forwarded: usize,
}

impl<'a, S: LogSink + ?Sized> Dispatcher<'a, S> {
    /// Creates a dispatcher that forwards logs to `sink`.
    pub const fn new(sink: &'a mut S) -> Self {
        Self { sink, forwarded: 0 }
    }

    /// Number of log frames forwarded so far.
    #[must_use]
    pub const fn forwarded_logs(&self) -> usize {
        self.forwarded
    }

    /// Decodes one frame body and advances the exchange.
    pub fn dispatch(&mut self, body: &[u8]) -> ExchangeState {
        match Message::from_slice(body) {
            Ok(message) => self.route(message),
            Err(error) => ExchangeState::Failed(error),
        }
    }

    /// Advances the exchange with an already classified message.
    pub fn route(&mut self, message: Message) -> ExchangeState {
        match message {
            Message::Error(report) => {
                debug!(
                    target: IPC_TARGET,
                    kind = %report.kind,
                    "daemon reported an error"
                );
                ExchangeState::Failed(report.into())
            }
            Message::Log(entry) => {
                self.sink.emit(&entry);
                self.forwarded += 1;
                ExchangeState::AwaitingFrame
            }
            Message::Payload { kind, data } => {
                trace!(
                    target: IPC_TARGET,
                    kind = %kind,
                    logs = self.forwarded,
                    "received terminal reply"
                );
                ExchangeState::Complete(data)
            }
        }
    }
}
