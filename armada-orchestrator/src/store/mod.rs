//! Persistence contract
//!
//! The orchestrator talks to storage through the [`Store`] trait so a durable
//! engine can be swapped in by the composition layer. The contract is
//! per-entity: insert-unique-per-(job, target) for runs, update-if-exists for
//! patches, no cross-entity transactions.

pub mod memory;

use std::collections::HashMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use armada_core::domain::job::{Job, JobRun, RunStatus};
use armada_core::domain::member::{FleetMember, LiveStatus, Role};
use armada_core::domain::script::Script;
use armada_core::dto::job::JobFilter;

pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row to update does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure outside the orchestrator's control
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Partial update applied to an existing run
///
/// `updated_at` is bumped by the store on every applied patch.
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub status: Option<RunStatus>,
    pub exit_code: Option<i32>,
    pub log: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.exit_code.is_none()
            && self.log.is_none()
            && self.started_at.is_none()
            && self.finished_at.is_none()
    }
}

/// Storage operations required by the orchestrator core
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Fleet members
    // =========================================================================

    /// Insert a new member; fails on a duplicate username or overlay address
    async fn insert_member(&self, member: FleetMember) -> Result<()>;

    async fn get_member(&self, username: &str) -> Result<Option<FleetMember>>;

    /// Active members, sorted by username
    async fn list_active_members(&self) -> Result<Vec<FleetMember>>;

    /// Every member of a role, active or not (addresses stay reserved)
    async fn members_by_role(&self, role: Role) -> Result<Vec<FleetMember>>;

    /// Overlay addresses for the given usernames; members without an address
    /// are simply absent from the map
    async fn resolve_addrs(&self, usernames: &[String]) -> Result<HashMap<String, Ipv4Addr>>;

    /// Replace a member row; fails if it does not exist or the new overlay
    /// address collides with another member
    async fn update_member(&self, member: FleetMember) -> Result<()>;

    /// Replace only a member's live status
    async fn update_live_status(&self, username: &str, live: LiveStatus) -> Result<()>;

    // =========================================================================
    // Scripts
    // =========================================================================

    async fn insert_script(&self, script: Script) -> Result<()>;

    async fn get_script(&self, name: &str) -> Result<Option<Script>>;

    /// All scripts, sorted by name
    async fn list_scripts(&self) -> Result<Vec<Script>>;

    async fn update_script(&self, script: Script) -> Result<()>;

    /// Returns whether a script was actually removed
    async fn delete_script(&self, name: &str) -> Result<bool>;

    // =========================================================================
    // Jobs and runs
    // =========================================================================

    async fn insert_job(&self, job: Job) -> Result<()>;

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>>;

    /// Jobs matching the filter, newest first
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>>;

    /// Insert runs, unique per (job, target)
    async fn insert_runs(&self, runs: Vec<JobRun>) -> Result<()>;

    async fn get_run(&self, job_id: Uuid, target: &str) -> Result<Option<JobRun>>;

    /// Runs of a job, optionally filtered by status, sorted by target
    async fn list_runs(&self, job_id: Uuid, status: Option<RunStatus>) -> Result<Vec<JobRun>>;

    /// Apply a patch if the run exists; returns the updated run, or `None`
    /// when there is nothing to update
    async fn update_run(
        &self,
        job_id: Uuid,
        target: &str,
        patch: RunPatch,
    ) -> Result<Option<JobRun>>;
}
