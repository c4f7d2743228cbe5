//! Per-command options attached to outbound requests.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Newest desired-state schema version this client speaks.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

/// Which copy of the network state a query reads.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StateKind {
    /// Live configuration of the host.
    #[default]
    RunningNetworkState,
    /// Last configuration persisted by the daemon.
    SavedNetworkState,
}

/// Options for `query-network-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Schema version the reply should use.
    pub version: u32,
    /// Scope of the query.
    pub kind: StateKind,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::running()
    }
}

impl QueryOptions {
    /// Queries the running state at the latest schema version.
    #[must_use]
    pub const fn running() -> Self {
        Self {
            version: LATEST_SCHEMA_VERSION,
            kind: StateKind::RunningNetworkState,
        }
    }

    /// Queries the saved state at the latest schema version.
    #[must_use]
    pub const fn saved() -> Self {
        Self {
            version: LATEST_SCHEMA_VERSION,
            kind: StateKind::SavedNetworkState,
        }
    }
}

/// Options for `apply-network-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplyOptions {
    /// Schema version of the desired state document.
    pub version: u32,
    /// Skip the daemon's verification pass after applying.
    pub no_verify: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            version: LATEST_SCHEMA_VERSION,
            no_verify: false,
        }
    }
}

impl ApplyOptions {
    /// Returns a copy with verification toggled off when `no_verify` is true.
    #[must_use]
    pub const fn with_no_verify(self, no_verify: bool) -> Self {
        Self { no_verify, ..self }
    }
}
