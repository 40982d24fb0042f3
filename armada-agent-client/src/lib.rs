//! Armada Agent Client
//!
//! HTTP client for the agent daemon running on every fleet member, plus the
//! per-member stats endpoint polled by the heartbeat loop. Members are
//! addressed directly over the private overlay network; every call carries a
//! fixed per-request timeout and is attempted exactly once; a subsequent
//! refresh cycle is the retry path.
//!
//! The [`AgentApi`] and [`StatsApi`] traits are the seams the orchestrator
//! depends on; [`HttpAgentClient`] and [`HttpStatsClient`] are the production
//! implementations.
//!
//! # Example
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//! use armada_agent_client::{AgentApi, HttpAgentClient};
//! use uuid::Uuid;
//!
//! # async fn example() -> armada_agent_client::Result<()> {
//! let client = HttpAgentClient::new(9010, Duration::from_millis(5000));
//! let status = client
//!     .job_status(Ipv4Addr::new(10, 77, 0, 1), Uuid::new_v4(), false)
//!     .await?;
//! println!("run is {}", status.status);
//! # Ok(())
//! # }
//! ```

mod agent;
pub mod error;
mod stats;

pub use agent::{AgentApi, HttpAgentClient};
pub use error::{AgentError, Result};
pub use stats::{HttpStatsClient, StatsApi};

/// Default port of the agent daemon on every fleet member
pub const DEFAULT_AGENT_PORT: u16 = 9010;

/// Default port of the stats endpoint on every fleet member
pub const DEFAULT_STATS_PORT: u16 = 9100;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
