use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Well-known path of the daemon's client socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/NetworkManager/sockets/daemon";

/// Time allowed for the daemon to produce a terminal reply.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Largest message body accepted in either direction (10 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default socket path for the daemon.
#[must_use]
pub fn default_socket_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SOCKET_PATH)
}

/// Default reply timeout in milliseconds.
#[must_use]
pub const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default maximum message size in bytes.
#[must_use]
pub const fn default_max_message_size() -> u64 {
    DEFAULT_MAX_MESSAGE_SIZE
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
