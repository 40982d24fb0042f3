//! Fleet member domain model
//!
//! A fleet member is a remote machine reachable over the private overlay
//! network at a stable assigned address. Its live status is mutated only by
//! the heartbeat poller; run state lives on [`crate::domain::job::JobRun`].

use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role class of a fleet member
///
/// A closed set: each role maps to its own overlay subnet pool, so the
/// mapping is exhaustively checkable at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Operator,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Worker => write!(f, "worker"),
            Role::Operator => write!(f, "operator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(Role::Worker),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized role string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid role: {0}")]
pub struct InvalidRole(pub String);

/// A machine enrolled in the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetMember {
    /// Unique identity of the member
    pub username: String,

    /// Stable overlay address, assigned once at registration or role change
    pub overlay_addr: Option<Ipv4Addr>,

    pub role: Role,

    /// Health/resource snapshot maintained by the heartbeat poller
    pub live: LiveStatus,

    pub active: bool,

    pub registered_at: DateTime<Utc>,
}

impl FleetMember {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            overlay_addr: None,
            role,
            live: LiveStatus::default(),
            active: true,
            registered_at: Utc::now(),
        }
    }
}

/// Live health/resource status of a fleet member
///
/// `poll_count` is a monotonically increasing count of successful heartbeat
/// polls, not a latency measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub online: bool,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub poll_count: u64,
    pub last_reported_at: Option<DateTime<Utc>>,
}
