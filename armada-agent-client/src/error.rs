//! Error types for agent calls

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors from talking to a fleet member's agent or stats endpoint
///
/// Every variant is target-scoped: a failed call is recorded against that
/// target's result and never aborts sibling calls.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Timeout or connection failure; the member is treated as unreachable
    #[error("agent unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The agent has no record of the job
    #[error("agent has no record of job {0}")]
    JobNotFound(Uuid),

    /// The agent answered with a non-success status
    #[error("agent error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body from the agent
        message: String,
    },

    /// The agent answered with a payload we could not decode
    #[error("failed to parse agent response: {0}")]
    Parse(String),
}

impl AgentError {
    /// Whether the member could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
