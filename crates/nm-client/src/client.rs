//! Convenience facade with one method per daemon command.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::command::Command;
use crate::connection::Connection;
use crate::error::{IpcError, ProtocolError};
use crate::log::LogSink;
use crate::options::{ApplyOptions, QueryOptions};

/// Client for the network-configuration daemon.
///
/// Wraps a single [`Connection`]; create one client per thread that needs to
/// talk to the daemon concurrently.
#[derive(Debug)]
pub struct NmClient {
    connection: Connection,
}

impl NmClient {
    /// Connects to the daemon at the default socket path.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the daemon socket is unreachable.
    pub fn new() -> Result<Self, IpcError> {
        Self::from_config(&nm_config::Config::default())
    }

    /// Connects to the daemon socket at `path` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the daemon socket is unreachable.
    pub fn connect<P>(path: P) -> Result<Self, IpcError>
    where
        P: AsRef<Path>,
    {
        Connection::connect(path).map(Self::from_connection)
    }

    /// Connects using the socket path, timeout and size limit from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the daemon socket is unreachable.
    pub fn from_config(config: &nm_config::Config) -> Result<Self, IpcError> {
        let mut connection = Connection::connect(config.daemon_socket())?;
        connection.set_timeout(config.timeout());
        connection.set_max_message_size(config.max_message_size());
        Ok(Self::from_connection(connection))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub const fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Bounds the wait for each reply; `None` blocks indefinitely.
    pub const fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.connection.set_timeout(timeout);
    }

    /// Replaces the sink receiving daemon log notifications.
    pub fn set_log_sink<S>(&mut self, sink: S)
    where
        S: LogSink + 'static,
    {
        self.connection.set_log_sink(sink);
    }

    /// Checks that the daemon is alive.
    ///
    /// # Errors
    ///
    /// Propagates exchange failures, or [`ProtocolError::UnexpectedPayload`]
    /// when the reply is not a string.
    pub fn ping(&mut self) -> Result<String, IpcError> {
        self.request(&Command::Ping)
    }

    /// Reads the running or saved network state.
    ///
    /// The state document is decoded into `T`; use [`Value`] to keep it
    /// opaque.
    ///
    /// # Errors
    ///
    /// Propagates exchange failures, or [`ProtocolError::UnexpectedPayload`]
    /// when the document does not decode into `T`.
    pub fn query_network_state<T>(&mut self, options: QueryOptions) -> Result<T, IpcError>
    where
        T: DeserializeOwned,
    {
        self.request(&Command::QueryNetworkState(options))
    }

    /// Applies a desired state document and returns the daemon confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Validation`] when the daemon rejects the document,
    /// [`IpcError::Daemon`] for other daemon failures, and
    /// [`IpcError::SerialiseCommand`] when `state` cannot be encoded.
    pub fn apply_network_state<S>(
        &mut self,
        state: &S,
        options: ApplyOptions,
    ) -> Result<Value, IpcError>
    where
        S: Serialize + ?Sized,
    {
        let command = Command::apply(state, options).map_err(IpcError::SerialiseCommand)?;
        self.connection.execute(&command)
    }

    /// Executes an arbitrary command and returns the raw reply payload.
    ///
    /// # Errors
    ///
    /// See [`Connection::execute`].
    pub fn execute(&mut self, command: &Command) -> Result<Value, IpcError> {
        self.connection.execute(command)
    }

    fn request<T>(&mut self, command: &Command) -> Result<T, IpcError>
    where
        T: DeserializeOwned,
    {
        let payload = self.connection.execute(command)?;
        serde_json::from_value(payload)
            .map_err(|error| ProtocolError::UnexpectedPayload(error).into())
    }
}
