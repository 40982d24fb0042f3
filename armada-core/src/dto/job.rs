//! Job operation payloads
//!
//! Contracts for the create/cancel/refresh operations and the live run-update
//! event. The ingress layer owns the wire encoding; these types define the
//! operation shapes only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{JobRun, RunStatus, StatusCounts};

/// Request to create a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub script_name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub targets: Vec<String>,
}

/// Request to cancel a job on a subset of its targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelJob {
    pub targets: Vec<String>,
}

/// Per-target outcome of a cancel request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub target: String,
    pub accepted: bool,
    pub message: String,
}

/// Aggregated cancel response; partial failure never becomes an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    pub results: Vec<CancelOutcome>,
}

/// How a refresh should contact the agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Poll each agent now and apply the results before returning
    Sync,
    /// Ask each agent to push an update later; return immediately
    Async,
}

/// Request to refresh run state for a subset of a job's targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshJob {
    pub targets: Vec<String>,
    #[serde(default)]
    pub include_log: bool,
    pub mode: RefreshMode,
}

/// Result of a refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RefreshResponse {
    /// Async mode: report requests were fired, updates arrive later
    Accepted,
    /// Sync mode: runs as of this poll, with a fresh tally
    Synced {
        runs: Vec<JobRun>,
        counts: StatusCounts,
    },
}

/// Live event emitted on every run transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRunUpdated {
    pub job_id: Uuid,
    pub target: String,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRunUpdated {
    pub fn from_run(run: &JobRun) -> Self {
        Self {
            job_id: run.job_id,
            target: run.target.clone(),
            status: run.status,
            exit_code: run.exit_code,
            log: run.log.clone(),
            updated_at: run.updated_at,
        }
    }
}

/// Filter for job listings
///
/// `run_status` keeps only jobs with at least one run currently in that
/// status; `skip`/`limit` page through the newest-first ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    pub script_name: Option<String>,
    pub created_by: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub run_status: Option<RunStatus>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}
