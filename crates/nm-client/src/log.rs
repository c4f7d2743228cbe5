//! Daemon log notifications and the sinks that receive them.
//!
//! The daemon interleaves `log` frames with its replies. Each one is decoded
//! into a [`LogEntry`] and handed to the connection's [`LogSink`]; none of
//! them affect the request in flight.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tracing::{debug, error, info};

use crate::error::{IpcError, ProtocolError};

/// Tracing target used when re-emitting daemon logs.
pub const DAEMON_LOG_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::daemon");

/// Envelope kind of log notifications.
pub const LOG_KIND: &str = "log";

/// Severity attached to a daemon log notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    /// Finest-grained daemon chatter.
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something unusual the daemon recovered from.
    Warn,
    /// A failure inside the daemon.
    Error,
}

impl LogLevel {
    /// Client-side level a daemon level is forwarded at.
    ///
    /// `warn` is deliberately folded into [`SinkLevel::Info`].
    #[must_use]
    pub const fn sink_level(self) -> SinkLevel {
        match self {
            Self::Trace | Self::Debug => SinkLevel::Debug,
            Self::Info | Self::Warn => SinkLevel::Info,
            Self::Error => SinkLevel::Error,
        }
    }
}

/// Client-side channel a daemon log is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    /// Debug channel.
    Debug,
    /// Info channel.
    Info,
    /// Error channel.
    Error,
}

/// A decoded daemon log notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Daemon component that produced the message.
    pub source: String,
    /// Daemon-side severity.
    pub level: LogLevel,
    /// Log text.
    pub message: String,
}

#[derive(Deserialize)]
struct WireLogEntry {
    source: String,
    level: String,
    message: String,
}

impl LogEntry {
    /// Decodes the `data` member of a `log` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedData`] when fields are missing and
    /// [`IpcError::Bug`] when the level is not one this client understands.
    pub fn from_value(data: Value) -> Result<Self, IpcError> {
        let wire: WireLogEntry =
            serde_json::from_value(data).map_err(|source| ProtocolError::MalformedData {
                kind: LOG_KIND.to_owned(),
                source,
            })?;
        let level = LogLevel::from_str(&wire.level).map_err(|_| IpcError::Bug {
            message: format!("unknown log level {}", wire.level),
        })?;
        Ok(Self {
            source: wire.source,
            level,
            message: wire.message,
        })
    }

    /// Client-side channel for this entry.
    #[must_use]
    pub const fn sink_level(&self) -> SinkLevel {
        self.level.sink_level()
    }
}

/// Receives daemon log notifications in arrival order.
pub trait LogSink: Send {
    /// Handles one log entry.
    fn emit(&mut self, entry: &LogEntry);
}

impl<F> LogSink for F
where
    F: FnMut(&LogEntry) + Send,
{
    fn emit(&mut self, entry: &LogEntry) {
        self(entry);
    }
}

/// Default sink forwarding daemon logs to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&mut self, entry: &LogEntry) {
        let source = entry.source.as_str();
        let message = entry.message.as_str();
        match entry.sink_level() {
            SinkLevel::Debug => debug!(target: DAEMON_LOG_TARGET, source, "{message}"),
            SinkLevel::Info => info!(target: DAEMON_LOG_TARGET, source, "{message}"),
            SinkLevel::Error => error!(target: DAEMON_LOG_TARGET, source, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case("trace", LogLevel::Trace, SinkLevel::Debug)]
    #[case("debug", LogLevel::Debug, SinkLevel::Debug)]
    #[case("info", LogLevel::Info, SinkLevel::Info)]
    #[case("warn", LogLevel::Warn, SinkLevel::Info)]
    #[case("error", LogLevel::Error, SinkLevel::Error)]
    fn routes_daemon_levels(
        #[case] wire: &str,
        #[case] level: LogLevel,
        #[case] channel: SinkLevel,
    ) {
        let entry = LogEntry::from_value(json!({
            "source": "daemon",
            "level": wire,
            "message": "applying state",
        }))
        .expect("log decodes");
        assert_eq!(entry.level, level);
        assert_eq!(entry.sink_level(), channel);
    }

    #[rstest]
    #[case("fatal")]
    #[case("WARN")]
    #[case("")]
    fn unknown_level_is_a_bug(#[case] wire: &str) {
        let error = LogEntry::from_value(json!({
            "source": "daemon",
            "level": wire,
            "message": "x",
        }))
        .expect_err("unknown level must fail");
        assert!(
            matches!(&error, IpcError::Bug { message } if message.contains("unknown log level")),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn missing_fields_are_malformed_data() {
        let error = LogEntry::from_value(json!({"level": "info"})).expect_err("must fail");
        assert!(
            matches!(
                &error,
                IpcError::Protocol(ProtocolError::MalformedData { kind, .. }) if kind == LOG_KIND
            ),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn closures_act_as_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |entry: &LogEntry| seen.push(entry.message.clone());
            let entry = LogEntry {
                source: "plugin-ovs".to_owned(),
                level: LogLevel::Info,
                message: "hello".to_owned(),
            };
            LogSink::emit(&mut sink, &entry);
        }
        assert_eq!(seen, vec![String::from("hello")]);
    }
}
