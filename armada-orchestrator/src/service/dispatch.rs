//! Job dispatch coordination
//!
//! Owns the job/run lifecycle. A run moves `pending -> running` on an
//! accepted dispatch, then to a terminal `success`/`failed` through a poll or
//! a pushed agent report; a failed dispatch takes it straight to `failed`
//! with a descriptive log and no exit code.
//!
//! All per-target agent calls fan out concurrently and settle independently:
//! one unreachable target delays and fails only its own run. Status counts
//! are re-aggregated from the full run set after every transition, and every
//! transition is published to the job's event stream.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use armada_agent_client::AgentApi;
use armada_core::domain::job::{Job, JobRun, RunStatus, StatusCounts};
use armada_core::dto::agent::{AgentRunUpdate, RunJobRequest};
use armada_core::dto::job::{
    CancelJob, CancelOutcome, CancelResponse, CreateJob, JobFilter, JobRunUpdated, RefreshJob,
    RefreshMode, RefreshResponse,
};
use armada_core::truncate::truncate_log;

use crate::events::{JobEventBus, JobSubscription};
use crate::store::{RunPatch, Store, StoreError};

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("run ({job_id}, {target}) not found")]
    RunNotFound { job_id: Uuid, target: String },

    #[error("script {0} not found")]
    ScriptNotFound(String),

    #[error("unknown fleet member: {0}")]
    MemberNotFound(String),

    #[error("duplicate targets in request")]
    DuplicateTargets,

    #[error("targets not part of this job: {}", .0.join(", "))]
    InvalidTargets(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Coordinates job creation, cancellation, refresh and live updates
#[derive(Clone)]
pub struct JobDispatchCoordinator {
    store: Arc<dyn Store>,
    agent: Arc<dyn AgentApi>,
    events: Arc<JobEventBus>,
    max_log_bytes: usize,
}

impl JobDispatchCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        agent: Arc<dyn AgentApi>,
        events: Arc<JobEventBus>,
        max_log_bytes: usize,
    ) -> Self {
        Self {
            store,
            agent,
            events,
            max_log_bytes,
        }
    }

    /// Create a job and dispatch it to every target
    ///
    /// Persists the job plus one pending run per target before any agent is
    /// contacted, then fans the dispatch out concurrently. A target whose
    /// dispatch fails ends up `failed` with the reason in its log; the
    /// remaining targets are unaffected. Returns once every dispatch attempt
    /// has settled.
    pub async fn create_job(&self, created_by: &str, req: CreateJob) -> Result<Job> {
        let script = self
            .store
            .get_script(&req.script_name)
            .await?
            .ok_or_else(|| DispatchError::ScriptNotFound(req.script_name.clone()))?;

        let unique: HashSet<&String> = req.targets.iter().collect();
        if unique.len() != req.targets.len() {
            return Err(DispatchError::DuplicateTargets);
        }

        for target in &req.targets {
            if self.store.get_member(target).await?.is_none() {
                return Err(DispatchError::MemberNotFound(target.clone()));
            }
        }

        let job = Job {
            id: Uuid::new_v4(),
            script_name: script.name.clone(),
            script_hash: script.hash.clone(),
            args: req.args,
            env: req.env,
            targets: req.targets.clone(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        self.store.insert_job(job.clone()).await?;
        self.store
            .insert_runs(
                job.targets
                    .iter()
                    .map(|target| JobRun::pending(job.id, target))
                    .collect(),
            )
            .await?;

        tracing::info!(
            job_id = %job.id,
            script = %job.script_name,
            targets = job.targets.len(),
            "job created, dispatching"
        );

        self.dispatch_to_agents(&job).await?;

        let counts = self.status_counts(job.id).await?;
        tracing::info!(
            job_id = %job.id,
            pending = counts.pending,
            running = counts.running,
            failed = counts.failed,
            "dispatch settled"
        );

        Ok(job)
    }

    /// Fan the run request out to every target concurrently
    async fn dispatch_to_agents(&self, job: &Job) -> Result<()> {
        let addrs = self.store.resolve_addrs(&job.targets).await?;
        let payload = RunJobRequest {
            script_name: job.script_name.clone(),
            script_hash: job.script_hash.clone(),
            args: job.args.clone(),
            env: job.env.clone(),
        };

        let mut handles = Vec::with_capacity(job.targets.len());
        for target in &job.targets {
            let coordinator = self.clone();
            let payload = payload.clone();
            let target = target.clone();
            let addr = addrs.get(&target).copied();
            let job_id = job.id;

            handles.push(tokio::spawn(async move {
                coordinator
                    .dispatch_one(job_id, &target, addr, &payload)
                    .await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("dispatch task panicked: {}", e);
            }
        }

        Ok(())
    }

    /// Dispatch to one target; failure settles only this target's run
    async fn dispatch_one(
        &self,
        job_id: Uuid,
        target: &str,
        addr: Option<Ipv4Addr>,
        payload: &RunJobRequest,
    ) {
        let Some(addr) = addr else {
            self.fail_run(job_id, target, "no overlay address assigned")
                .await;
            return;
        };

        match self.agent.run_job(addr, job_id, payload).await {
            Ok(()) => {
                let patch = RunPatch {
                    status: Some(RunStatus::Running),
                    started_at: Some(Utc::now()),
                    ..RunPatch::default()
                };
                self.patch_and_emit(job_id, target, patch).await;
            }
            Err(e) => {
                tracing::warn!(%job_id, target, error = %e, "dispatch failed");
                self.fail_run(job_id, target, &format!("dispatch failed: {}", e))
                    .await;
            }
        }
    }

    /// Cancel a job on the given targets
    ///
    /// Per-target outcomes are aggregated, never thrown: a target whose run
    /// is already terminal answers `accepted = false`, as does one that
    /// cannot be reached.
    pub async fn cancel_job(&self, job_id: Uuid, req: CancelJob) -> Result<CancelResponse> {
        let job = self.require_job(job_id).await?;
        self.validate_targets(&job, &req.targets)?;

        let addrs = self.store.resolve_addrs(&req.targets).await?;

        let mut handles = Vec::with_capacity(req.targets.len());
        for target in &req.targets {
            let coordinator = self.clone();
            let target = target.clone();
            let addr = addrs.get(&target).copied();

            handles.push(tokio::spawn(async move {
                coordinator.cancel_one(job_id, target, addr).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (handle, target) in handles.into_iter().zip(&req.targets) {
            match handle.await {
                Ok(outcome) => results.push(outcome),
                Err(e) => {
                    tracing::warn!("cancel task panicked: {}", e);
                    results.push(CancelOutcome {
                        target: target.clone(),
                        accepted: false,
                        message: "cancel task failed".to_string(),
                    });
                }
            }
        }

        Ok(CancelResponse { job_id, results })
    }

    async fn cancel_one(&self, job_id: Uuid, target: String, addr: Option<Ipv4Addr>) -> CancelOutcome {
        let run = match self.store.get_run(job_id, &target).await {
            Ok(Some(run)) => run,
            Ok(None) => {
                return CancelOutcome {
                    target,
                    accepted: false,
                    message: "run not found".to_string(),
                };
            }
            Err(e) => {
                return CancelOutcome {
                    target,
                    accepted: false,
                    message: e.to_string(),
                };
            }
        };

        if run.status.is_terminal() {
            return CancelOutcome {
                target,
                accepted: false,
                message: format!("run already {}", run.status),
            };
        }

        let Some(addr) = addr else {
            return CancelOutcome {
                target,
                accepted: false,
                message: "no overlay address assigned".to_string(),
            };
        };

        match self.agent.cancel_job(addr, job_id).await {
            Ok(()) => CancelOutcome {
                target,
                accepted: true,
                message: "cancel requested".to_string(),
            },
            Err(e) => CancelOutcome {
                target,
                accepted: false,
                message: e.to_string(),
            },
        }
    }

    /// Refresh run state for the given targets
    ///
    /// Sync mode polls each agent now and applies the answers; a target whose
    /// poll fails keeps its current run state. Async mode only asks each
    /// agent to push a report later and returns immediately.
    pub async fn refresh_job(&self, job_id: Uuid, req: RefreshJob) -> Result<RefreshResponse> {
        let job = self.require_job(job_id).await?;
        self.validate_targets(&job, &req.targets)?;

        let addrs = self.store.resolve_addrs(&req.targets).await?;

        match req.mode {
            RefreshMode::Async => {
                self.fire_report_requests(job_id, &req.targets, &addrs, req.include_log)
                    .await;
                Ok(RefreshResponse::Accepted)
            }
            RefreshMode::Sync => {
                let mut handles = Vec::with_capacity(req.targets.len());
                for target in &req.targets {
                    let coordinator = self.clone();
                    let target = target.clone();
                    let addr = addrs.get(&target).copied();
                    let include_log = req.include_log;

                    handles.push(tokio::spawn(async move {
                        coordinator
                            .sync_run_from_agent(job_id, &target, addr, include_log)
                            .await;
                    }));
                }
                for handle in handles {
                    if let Err(e) = handle.await {
                        tracing::warn!("refresh task panicked: {}", e);
                    }
                }

                let requested: HashSet<&String> = req.targets.iter().collect();
                let runs: Vec<JobRun> = self
                    .store
                    .list_runs(job_id, None)
                    .await?
                    .into_iter()
                    .filter(|run| requested.contains(&run.target))
                    .collect();
                let counts = self.status_counts(job_id).await?;

                Ok(RefreshResponse::Synced { runs, counts })
            }
        }
    }

    async fn fire_report_requests(
        &self,
        job_id: Uuid,
        targets: &[String],
        addrs: &HashMap<String, Ipv4Addr>,
        include_log: bool,
    ) {
        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            let Some(addr) = addrs.get(target).copied() else {
                continue;
            };
            let agent = Arc::clone(&self.agent);
            let target = target.clone();

            handles.push(tokio::spawn(async move {
                if let Err(e) = agent.request_report(addr, job_id, include_log).await {
                    tracing::debug!(%job_id, target, error = %e, "report request failed");
                }
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("report task panicked: {}", e);
            }
        }
    }

    /// Pull one target's state from its agent and apply any change
    ///
    /// A poll failure leaves the run exactly as it was; the next refresh
    /// cycle is the retry path.
    async fn sync_run_from_agent(
        &self,
        job_id: Uuid,
        target: &str,
        addr: Option<Ipv4Addr>,
        include_log: bool,
    ) {
        let Some(addr) = addr else {
            return;
        };

        let agent_status = match self.agent.job_status(addr, job_id, include_log).await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(%job_id, target, error = %e, "poll failed, leaving run unchanged");
                return;
            }
        };

        let mut patch = RunPatch::default();

        // An exit code means the agent's status is terminal and wins; without
        // one, only pending/running progress reports are applied.
        if let Some(exit_code) = agent_status.exit_code {
            patch.exit_code = Some(exit_code);
            patch.status = Some(agent_status.status);
            patch.finished_at = agent_status.finished_at;
        } else if matches!(agent_status.status, RunStatus::Running | RunStatus::Pending) {
            patch.status = Some(agent_status.status);
        }

        if let Some(started_at) = agent_status.started_at {
            patch.started_at = Some(started_at);
        }

        if include_log {
            if let Some(log) = agent_status.log {
                patch.log = Some(truncate_log(&log, self.max_log_bytes).into_owned());
            }
        }

        if !patch.is_empty() {
            self.patch_and_emit(job_id, target, patch).await;
        }
    }

    /// Apply a status update pushed by an agent after a report request
    pub async fn apply_agent_update(
        &self,
        job_id: Uuid,
        target: &str,
        update: AgentRunUpdate,
    ) -> Result<JobRun> {
        self.store
            .get_run(job_id, target)
            .await?
            .ok_or_else(|| DispatchError::RunNotFound {
                job_id,
                target: target.to_string(),
            })?;

        let patch = RunPatch {
            status: update.status,
            exit_code: update.exit_code,
            log: update
                .log
                .map(|log| truncate_log(&log, self.max_log_bytes).into_owned()),
            finished_at: update
                .status
                .filter(RunStatus::is_terminal)
                .map(|_| Utc::now()),
            ..RunPatch::default()
        };

        let run = self
            .store
            .update_run(job_id, target, patch)
            .await?
            .ok_or_else(|| DispatchError::RunNotFound {
                job_id,
                target: target.to_string(),
            })?;

        self.events.emit(job_id, JobRunUpdated::from_run(&run));

        let counts = self.status_counts(job_id).await?;
        tracing::debug!(
            %job_id,
            target,
            status = %run.status,
            success = counts.success,
            failed = counts.failed,
            "agent update applied"
        );

        Ok(run)
    }

    /// Full re-aggregation of a job's run statuses
    pub async fn status_counts(&self, job_id: Uuid) -> Result<StatusCounts> {
        let runs = self.store.list_runs(job_id, None).await?;
        Ok(StatusCounts::tally(&runs))
    }

    /// Live event stream for a job, starting at the subscription point
    pub async fn subscribe(&self, job_id: Uuid) -> Result<JobSubscription> {
        self.require_job(job_id).await?;
        Ok(self.events.subscribe(job_id))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        self.require_job(job_id).await
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        Ok(self.store.list_jobs(filter).await?)
    }

    pub async fn list_runs(&self, job_id: Uuid, status: Option<RunStatus>) -> Result<Vec<JobRun>> {
        self.require_job(job_id).await?;
        Ok(self.store.list_runs(job_id, status).await?)
    }

    pub async fn get_run(&self, job_id: Uuid, target: &str) -> Result<JobRun> {
        self.store
            .get_run(job_id, target)
            .await?
            .ok_or_else(|| DispatchError::RunNotFound {
                job_id,
                target: target.to_string(),
            })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn require_job(&self, job_id: Uuid) -> Result<Job> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(DispatchError::JobNotFound(job_id))
    }

    fn validate_targets(&self, job: &Job, requested: &[String]) -> Result<()> {
        let allowed: HashSet<&String> = job.targets.iter().collect();
        let invalid: Vec<String> = requested
            .iter()
            .filter(|t| !allowed.contains(t))
            .cloned()
            .collect();

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::InvalidTargets(invalid))
        }
    }

    /// Settle a run as failed with a descriptive log and no exit code
    async fn fail_run(&self, job_id: Uuid, target: &str, message: &str) {
        let patch = RunPatch {
            status: Some(RunStatus::Failed),
            log: Some(truncate_log(message, self.max_log_bytes).into_owned()),
            finished_at: Some(Utc::now()),
            ..RunPatch::default()
        };
        self.patch_and_emit(job_id, target, patch).await;
    }

    /// Apply a patch and publish the transition; storage failure here is
    /// logged, not propagated, so sibling targets keep settling
    async fn patch_and_emit(&self, job_id: Uuid, target: &str, patch: RunPatch) {
        match self.store.update_run(job_id, target, patch).await {
            Ok(Some(run)) => {
                self.events.emit(job_id, JobRunUpdated::from_run(&run));
            }
            Ok(None) => {
                tracing::warn!(%job_id, target, "run vanished before update");
            }
            Err(e) => {
                tracing::error!(%job_id, target, error = %e, "failed to persist run update");
            }
        }
    }
}
