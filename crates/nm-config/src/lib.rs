//! Shared configuration for the NetworkManager daemon client.
//!
//! Values are layered by `ortho_config`: command-line flags override `NM_*`
//! environment variables, which override the configuration file, which
//! overrides the defaults defined in this crate.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SOCKET_PATH, DEFAULT_TIMEOUT_MS,
    default_log_filter_string, default_log_format, default_max_message_size, default_socket_path,
    default_timeout_ms,
};
pub use logging::LogFormat;

/// Client configuration shared by the library facade and the `nmc` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "NM")]
pub struct Config {
    /// Filesystem path of the daemon socket.
    #[serde(default = "default_socket_path")]
    pub daemon_socket: Utf8PathBuf,
    /// Milliseconds to wait for a terminal reply; `0` waits forever.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Largest message body, in bytes, sent or accepted.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: u64,
    /// Tracing filter expression.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Tracing output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_path(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path of the daemon socket.
    #[must_use]
    pub fn daemon_socket(&self) -> &Utf8Path {
        self.daemon_socket.as_path()
    }

    /// Reply timeout, or `None` when the client should block indefinitely.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    /// Message size limit, saturated to the platform's address space.
    #[must_use]
    pub fn max_message_size(&self) -> usize {
        usize::try_from(self.max_message_size).unwrap_or(usize::MAX)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
