//! Outbound requests understood by the daemon.
//!
//! Each command encodes to a `{kind, data}` envelope:
//!
//! | command               | `data`                                   |
//! |-----------------------|------------------------------------------|
//! | `ping`                | `"ping"`                                 |
//! | `query-network-state` | `{"version": V, "kind": SCOPE}`          |
//! | `apply-network-state` | `[STATE, {"version": V, "no-verify": B}]` |

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::options::{ApplyOptions, QueryOptions};

/// Kind tag of the ping command.
pub const PING_KIND: &str = "ping";
/// Kind tag of the state query command.
pub const QUERY_KIND: &str = "query-network-state";
/// Kind tag of the state apply command.
pub const APPLY_KIND: &str = "apply-network-state";

/// A request sent to the daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Liveness probe; the daemon answers `pong`.
    Ping,
    /// Reads the running or saved network state.
    QueryNetworkState(QueryOptions),
    /// Applies a desired state document.
    ApplyNetworkState {
        /// Opaque desired state, passed through untouched.
        desired_state: Value,
        /// Apply options.
        options: ApplyOptions,
    },
}

impl Command {
    /// Builds an apply command from any serialisable state document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when `state` cannot be represented as
    /// JSON, for example a map with non-string keys.
    pub fn apply<S>(state: &S, options: ApplyOptions) -> Result<Self, serde_json::Error>
    where
        S: Serialize + ?Sized,
    {
        Ok(Self::ApplyNetworkState {
            desired_state: serde_json::to_value(state)?,
            options,
        })
    }

    /// Envelope kind of this command.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ping => PING_KIND,
            Self::QueryNetworkState(_) => QUERY_KIND,
            Self::ApplyNetworkState { .. } => APPLY_KIND,
        }
    }

    /// Encodes the command as an envelope body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if encoding fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("kind", self.kind())?;
        match self {
            Self::Ping => map.serialize_entry("data", PING_KIND)?,
            Self::QueryNetworkState(options) => map.serialize_entry("data", options)?,
            Self::ApplyNetworkState {
                desired_state,
                options,
            } => map.serialize_entry("data", &(desired_state, options))?,
        }
        map.end()
    }
}
