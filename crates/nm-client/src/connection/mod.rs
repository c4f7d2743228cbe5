//! Blocking request/response exchanges over the daemon socket.
//!
//! A [`Connection`] owns one Unix stream socket. [`Connection::execute`]
//! writes a command frame and then reads frames until the dispatcher reaches
//! a terminal state. The protocol carries no request identifiers, so exactly
//! one exchange may be in flight: the `&mut self` receiver enforces this, and
//! callers needing concurrency open one connection each.
//!
//! Any failure other than a daemon-reported error leaves the stream at an
//! unknown position. The socket is then shut down and every later call
//! returns [`IpcError::Closed`].

use std::fmt;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::Value;
use socket2::{Domain, SockAddr, Socket, Type};
use tracing::{debug, trace, warn};

use crate::IPC_TARGET;
use crate::codec::{frame_length, read_frame, write_frame};
use crate::command::Command;
use crate::dispatch::{Dispatcher, ExchangeState};
use crate::error::IpcError;
use crate::log::{LogSink, TracingLogSink};

/// Upper bound on establishing the socket connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const PEER: &str = "client<->daemon";

/// An exclusive connection to the daemon.
pub struct Connection {
    stream: UnixStream,
    sink: Box<dyn LogSink>,
    timeout: Option<Duration>,
    max_message_size: usize,
    endpoint: String,
    closed: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_message_size", &self.max_message_size)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connects to the daemon socket at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the socket is missing, refuses the
    /// connection or does not answer within [`CONNECT_TIMEOUT`].
    pub fn connect<P>(path: P) -> Result<Self, IpcError>
    where
        P: AsRef<Path>,
    {
        let socket_path = path.as_ref();
        let endpoint = socket_path.display().to_string();
        let stream = connect_unix(socket_path).map_err(|source| IpcError::Connect {
            path: endpoint.clone(),
            source,
        })?;
        debug!(target: IPC_TARGET, endpoint = %endpoint, "connected to daemon");
        Ok(Self::with_endpoint(stream, endpoint))
    }

    /// Wraps an already connected stream.
    #[must_use]
    pub fn from_stream(stream: UnixStream) -> Self {
        let endpoint = stream
            .peer_addr()
            .ok()
            .and_then(|address| address.as_pathname().map(|path| path.display().to_string()))
            .unwrap_or_else(|| String::from("(unnamed)"));
        Self::with_endpoint(stream, endpoint)
    }

    fn with_endpoint(stream: UnixStream, endpoint: String) -> Self {
        Self {
            stream,
            sink: Box::new(TracingLogSink),
            timeout: Some(Duration::from_millis(nm_config::DEFAULT_TIMEOUT_MS)),
            max_message_size: usize::try_from(nm_config::DEFAULT_MAX_MESSAGE_SIZE)
                .unwrap_or(usize::MAX),
            endpoint,
            closed: false,
        }
    }

    /// Socket path this connection was opened against.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bounds the wait for a terminal reply; `None` blocks indefinitely.
    pub const fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Current reply timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Limits the size of message bodies in both directions.
    pub const fn set_max_message_size(&mut self, max: usize) {
        self.max_message_size = max;
    }

    /// Replaces the sink receiving daemon log notifications.
    pub fn set_log_sink<S>(&mut self, sink: S)
    where
        S: LogSink + 'static,
    {
        self.sink = Box::new(sink);
    }

    /// Returns true once the connection has been shut down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Shuts the socket down; later calls fail with [`IpcError::Closed`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(error) = self.stream.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            warn!(
                target: IPC_TARGET,
                endpoint = %self.endpoint,
                error = %error,
                "failed to shut down daemon socket"
            );
        }
        self.closed = true;
    }

    /// Sends `command` and blocks until the daemon answers it.
    ///
    /// Log notifications received meanwhile go to the log sink.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Validation`] or [`IpcError::Daemon`] when the daemon
    /// rejects the command; the connection stays usable in that case. Every
    /// other error closes the connection, except encoding failures detected
    /// before anything was written.
    pub fn execute(&mut self, command: &Command) -> Result<Value, IpcError> {
        if self.closed {
            return Err(IpcError::Closed);
        }
        let body = command.to_vec().map_err(IpcError::SerialiseCommand)?;
        frame_length(body.len(), self.max_message_size)?;

        let deadline = self
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let outcome = self.exchange(&body, deadline);
        if let Err(error) = &outcome
            && !error.is_daemon_report()
        {
            debug!(
                target: IPC_TARGET,
                endpoint = %self.endpoint,
                command = command.kind(),
                error = %error,
                "closing daemon connection after failed exchange"
            );
            self.close();
        }
        outcome
    }

    fn exchange(&mut self, body: &[u8], deadline: Option<Instant>) -> Result<Value, IpcError> {
        if deadline.is_none() {
            self.stream.set_read_timeout(None).map_err(IpcError::Io)?;
            self.stream.set_write_timeout(None).map_err(IpcError::Io)?;
        }
        let timeout_ms = self.timeout_ms();
        let mut stream = DeadlineStream {
            stream: &self.stream,
            deadline,
        };

        trace!(target: IPC_TARGET, "{PEER}: {}", String::from_utf8_lossy(body));
        write_frame(&mut stream, body, self.max_message_size)
            .map_err(|error| expired(error, timeout_ms))?;

        let mut dispatcher = Dispatcher::new(self.sink.as_mut());
        loop {
            let reply = read_frame(&mut stream, self.max_message_size)
                .map_err(|error| expired(error, timeout_ms))?;
            trace!(target: IPC_TARGET, "{PEER}: {}", String::from_utf8_lossy(&reply));
            match dispatcher.dispatch(&reply) {
                ExchangeState::AwaitingFrame => {}
                ExchangeState::Complete(data) => return Ok(data),
                ExchangeState::Failed(error) => return Err(error),
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.map_or(0, |timeout| {
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
        })
    }
}

fn connect_unix(path: &Path) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECT_TIMEOUT)?;
    Ok(socket.into())
}

/// Maps socket timeouts raised by an armed deadline onto [`IpcError::Timeout`].
fn expired(error: IpcError, timeout_ms: u64) -> IpcError {
    match error {
        IpcError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            IpcError::Timeout { timeout_ms }
        }
        other => other,
    }
}

/// Stream view that bounds every read and write by a shared deadline.
struct DeadlineStream<'a> {
    stream: &'a UnixStream,
    deadline: Option<Instant>,
}

impl DeadlineStream<'_> {
    fn remaining(&self) -> io::Result<Option<Duration>> {
        let Some(deadline) = self.deadline else {
            return Ok(None);
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        Ok(Some(remaining))
    }
}

impl Read for DeadlineStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(remaining) = self.remaining()? {
            self.stream.set_read_timeout(Some(remaining))?;
        }
        let mut stream = self.stream;
        stream.read(buf)
    }
}

impl Write for DeadlineStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(remaining) = self.remaining()? {
            self.stream.set_write_timeout(Some(remaining))?;
        }
        let mut stream = self.stream;
        stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut stream = self.stream;
        stream.flush()
    }
}
