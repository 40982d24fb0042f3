//! Job and run domain types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An operator-issued request to run a named script on one or more targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub script_name: String,
    /// Hash of the script content at creation time
    pub script_hash: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Fleet member identities, each appearing exactly once
    pub targets: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Execution status of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    /// Whether the run can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The execution record of one job on one target
///
/// Keyed by (job_id, target); exactly one run exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    pub job_id: Uuid,
    pub target: String,
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    /// Captured output, size-bounded before storage
    pub log: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl JobRun {
    /// A fresh pending run for one target of a job
    pub fn pending(job_id: Uuid, target: impl Into<String>) -> Self {
        Self {
            job_id,
            target: target.into(),
            status: RunStatus::Pending,
            exit_code: None,
            log: None,
            started_at: None,
            finished_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// Derived tally over a job's runs
///
/// Always recomputed from the full run set; the sum equals the job's target
/// count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
}

impl StatusCounts {
    /// Tally run statuses from scratch
    pub fn tally<'a>(runs: impl IntoIterator<Item = &'a JobRun>) -> Self {
        let mut counts = StatusCounts::default();
        for run in runs {
            match run.status {
                RunStatus::Pending => counts.pending += 1,
                RunStatus::Running => counts.running += 1,
                RunStatus::Success => counts.success += 1,
                RunStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.success + self.failed
    }
}
