//! Client library for the network-configuration daemon.
//!
//! Requests and replies travel over a local stream socket as length-prefixed
//! JSON frames. The daemon may interleave `log` notifications with its reply;
//! these are forwarded to a [`LogSink`] and never returned as the result.
//!
//! ```no_run
//! use nm_client::{ApplyOptions, IpcError, NmClient, QueryOptions};
//! use serde_json::{Value, json};
//!
//! fn main() -> Result<(), IpcError> {
//!     let mut client = NmClient::new()?;
//!     assert_eq!(client.ping()?, "pong");
//!
//!     let state: Value = client.query_network_state(QueryOptions::running())?;
//!     println!("{state}");
//!
//!     let desired = json!({"interfaces": [{"name": "eth0", "mtu": 1500}]});
//!     match client.apply_network_state(&desired, ApplyOptions::default()) {
//!         Err(IpcError::Validation { message }) => eprintln!("rejected: {message}"),
//!         other => {
//!             other?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod log;
pub mod options;

/// Tracing target shared by transport and dispatch events.
pub(crate) const IPC_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::ipc");

pub use client::NmClient;
pub use command::Command;
pub use connection::{CONNECT_TIMEOUT, Connection};
pub use dispatch::{Dispatcher, Envelope, ExchangeState, Message};
pub use error::{ErrorReport, IpcError, ProtocolError};
pub use log::{LogEntry, LogLevel, LogSink, SinkLevel, TracingLogSink};
pub use options::{ApplyOptions, LATEST_SCHEMA_VERSION, QueryOptions, StateKind};
