//! Agent protocol payloads
//!
//! Every fleet member runs an agent daemon at
//! `http://<overlay-addr>:<agent-port>` exposing run/cancel/status/report,
//! plus a stats endpoint on its own port polled by the heartbeat loop.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::RunStatus;

/// Body of `POST /jobs/{id}/run`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJobRequest {
    pub script_name: String,
    pub script_hash: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Response of `GET /jobs/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentJobStatus {
    pub status: RunStatus,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /jobs/{id}/report`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReportRequest {
    pub include_log: bool,
}

/// Partial status update pushed by an agent after a report request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunUpdate {
    pub status: Option<RunStatus>,
    pub exit_code: Option<i32>,
    pub log: Option<String>,
}

/// Response of the per-member stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineStats {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub last_reported_at: DateTime<Utc>,
}
