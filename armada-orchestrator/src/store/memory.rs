//! In-memory store
//!
//! Reference implementation of [`Store`] over `tokio::sync::RwLock`ed maps.
//! Backs the test suites and small single-process deployments; a durable
//! engine implements the same trait elsewhere.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use armada_core::domain::job::{Job, JobRun, RunStatus};
use armada_core::domain::member::{FleetMember, LiveStatus, Role};
use armada_core::domain::script::Script;
use armada_core::dto::job::JobFilter;

use super::{Result, RunPatch, Store, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    members: RwLock<HashMap<String, FleetMember>>,
    scripts: RwLock<HashMap<String, Script>>,
    jobs: RwLock<HashMap<Uuid, Job>>,
    runs: RwLock<HashMap<(Uuid, String), JobRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_member(&self, member: FleetMember) -> Result<()> {
        let mut members = self.members.write().await;

        if members.contains_key(&member.username) {
            return Err(StoreError::Conflict(format!(
                "member {} already exists",
                member.username
            )));
        }

        if let Some(addr) = member.overlay_addr {
            if let Some(holder) = members.values().find(|m| m.overlay_addr == Some(addr)) {
                return Err(StoreError::Conflict(format!(
                    "overlay address {} already assigned to {}",
                    addr, holder.username
                )));
            }
        }

        members.insert(member.username.clone(), member);
        Ok(())
    }

    async fn get_member(&self, username: &str) -> Result<Option<FleetMember>> {
        Ok(self.members.read().await.get(username).cloned())
    }

    async fn list_active_members(&self) -> Result<Vec<FleetMember>> {
        let members = self.members.read().await;
        let mut active: Vec<_> = members.values().filter(|m| m.active).cloned().collect();
        active.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(active)
    }

    async fn members_by_role(&self, role: Role) -> Result<Vec<FleetMember>> {
        let members = self.members.read().await;
        let mut of_role: Vec<_> = members.values().filter(|m| m.role == role).cloned().collect();
        of_role.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(of_role)
    }

    async fn resolve_addrs(&self, usernames: &[String]) -> Result<HashMap<String, Ipv4Addr>> {
        let members = self.members.read().await;
        Ok(usernames
            .iter()
            .filter_map(|name| {
                let member = members.get(name)?;
                Some((name.clone(), member.overlay_addr?))
            })
            .collect())
    }

    async fn update_member(&self, member: FleetMember) -> Result<()> {
        let mut members = self.members.write().await;

        if !members.contains_key(&member.username) {
            return Err(StoreError::NotFound(format!(
                "member {}",
                member.username
            )));
        }

        if let Some(addr) = member.overlay_addr {
            if let Some(holder) = members
                .values()
                .find(|m| m.username != member.username && m.overlay_addr == Some(addr))
            {
                return Err(StoreError::Conflict(format!(
                    "overlay address {} already assigned to {}",
                    addr, holder.username
                )));
            }
        }

        members.insert(member.username.clone(), member);
        Ok(())
    }

    async fn update_live_status(&self, username: &str, live: LiveStatus) -> Result<()> {
        let mut members = self.members.write().await;
        let member = members
            .get_mut(username)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", username)))?;
        member.live = live;
        Ok(())
    }

    async fn insert_script(&self, script: Script) -> Result<()> {
        let mut scripts = self.scripts.write().await;
        if scripts.contains_key(&script.name) {
            return Err(StoreError::Conflict(format!(
                "script {} already exists",
                script.name
            )));
        }
        scripts.insert(script.name.clone(), script);
        Ok(())
    }

    async fn get_script(&self, name: &str) -> Result<Option<Script>> {
        Ok(self.scripts.read().await.get(name).cloned())
    }

    async fn list_scripts(&self) -> Result<Vec<Script>> {
        let scripts = self.scripts.read().await;
        let mut all: Vec<_> = scripts.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update_script(&self, script: Script) -> Result<()> {
        let mut scripts = self.scripts.write().await;
        if !scripts.contains_key(&script.name) {
            return Err(StoreError::NotFound(format!("script {}", script.name)));
        }
        scripts.insert(script.name.clone(), script);
        Ok(())
    }

    async fn delete_script(&self, name: &str) -> Result<bool> {
        Ok(self.scripts.write().await.remove(name).is_some())
    }

    async fn insert_job(&self, job: Job) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        // A run-status filter resolves through the run set: a job matches
        // when at least one of its runs is currently in that status.
        let with_status: Option<HashSet<Uuid>> = match filter.run_status {
            Some(status) => {
                let runs = self.runs.read().await;
                Some(
                    runs.values()
                        .filter(|run| run.status == status)
                        .map(|run| run.job_id)
                        .collect(),
                )
            }
            None => None,
        };

        let jobs = self.jobs.read().await;
        let mut matched: Vec<_> = jobs
            .values()
            .filter(|job| {
                filter
                    .script_name
                    .as_ref()
                    .is_none_or(|name| &job.script_name == name)
                    && filter
                        .created_by
                        .as_ref()
                        .is_none_or(|by| &job.created_by == by)
                    && filter.from.is_none_or(|from| job.created_at >= from)
                    && filter.to.is_none_or(|to| job.created_at <= to)
                    && with_status
                        .as_ref()
                        .is_none_or(|ids| ids.contains(&job.id))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let skip = filter.skip.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_runs(&self, new_runs: Vec<JobRun>) -> Result<()> {
        let mut runs = self.runs.write().await;

        for run in &new_runs {
            if runs.contains_key(&(run.job_id, run.target.clone())) {
                return Err(StoreError::Conflict(format!(
                    "run ({}, {}) already exists",
                    run.job_id, run.target
                )));
            }
        }

        for run in new_runs {
            runs.insert((run.job_id, run.target.clone()), run);
        }
        Ok(())
    }

    async fn get_run(&self, job_id: Uuid, target: &str) -> Result<Option<JobRun>> {
        Ok(self
            .runs
            .read()
            .await
            .get(&(job_id, target.to_string()))
            .cloned())
    }

    async fn list_runs(&self, job_id: Uuid, status: Option<RunStatus>) -> Result<Vec<JobRun>> {
        let runs = self.runs.read().await;
        let mut matched: Vec<_> = runs
            .values()
            .filter(|run| run.job_id == job_id && status.is_none_or(|s| run.status == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.target.cmp(&b.target));
        Ok(matched)
    }

    async fn update_run(
        &self,
        job_id: Uuid,
        target: &str,
        patch: RunPatch,
    ) -> Result<Option<JobRun>> {
        let mut runs = self.runs.write().await;

        let Some(run) = runs.get_mut(&(job_id, target.to_string())) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            run.status = status;
        }
        if let Some(exit_code) = patch.exit_code {
            run.exit_code = Some(exit_code);
        }
        if let Some(log) = patch.log {
            run.log = Some(log);
        }
        if let Some(started_at) = patch.started_at {
            run.started_at = Some(started_at);
        }
        if let Some(finished_at) = patch.finished_at {
            run.finished_at = Some(finished_at);
        }
        run.updated_at = Utc::now();

        Ok(Some(run.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_member_rejected() {
        let store = MemoryStore::new();
        store
            .insert_member(FleetMember::new("node-01", Role::Worker))
            .await
            .unwrap();

        let err = store
            .insert_member(FleetMember::new("node-01", Role::Worker))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_address_collision_rejected() {
        let store = MemoryStore::new();
        let addr = Ipv4Addr::new(10, 77, 0, 1);

        let mut first = FleetMember::new("node-01", Role::Worker);
        first.overlay_addr = Some(addr);
        store.insert_member(first).await.unwrap();

        let mut second = FleetMember::new("node-02", Role::Worker);
        second.overlay_addr = Some(addr);
        let err = store.insert_member(second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_runs_unique_per_job_target() {
        let store = MemoryStore::new();
        let job_id = Uuid::new_v4();

        store
            .insert_runs(vec![JobRun::pending(job_id, "a")])
            .await
            .unwrap();

        let err = store
            .insert_runs(vec![JobRun::pending(job_id, "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The same target under a different job is a different run.
        store
            .insert_runs(vec![JobRun::pending(Uuid::new_v4(), "a")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_run_is_update_if_exists() {
        let store = MemoryStore::new();
        let job_id = Uuid::new_v4();

        let missing = store
            .update_run(
                job_id,
                "ghost",
                RunPatch {
                    status: Some(RunStatus::Failed),
                    ..RunPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());

        store
            .insert_runs(vec![JobRun::pending(job_id, "a")])
            .await
            .unwrap();

        let updated = store
            .update_run(
                job_id,
                "a",
                RunPatch {
                    status: Some(RunStatus::Success),
                    exit_code: Some(0),
                    ..RunPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, RunStatus::Success);
        assert_eq!(updated.exit_code, Some(0));
        // Untouched fields survive the patch.
        assert!(updated.log.is_none());
    }

    #[tokio::test]
    async fn test_list_runs_sorted_by_target() {
        let store = MemoryStore::new();
        let job_id = Uuid::new_v4();

        store
            .insert_runs(vec![
                JobRun::pending(job_id, "c"),
                JobRun::pending(job_id, "a"),
                JobRun::pending(job_id, "b"),
            ])
            .await
            .unwrap();

        let runs = store.list_runs(job_id, None).await.unwrap();
        let targets: Vec<_> = runs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["a", "b", "c"]);
    }

    fn job_named(script: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            script_name: script.to_string(),
            script_hash: String::new(),
            args: Vec::new(),
            env: HashMap::new(),
            targets: vec!["t".to_string()],
            created_by: "ops".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_run_status() {
        let store = MemoryStore::new();
        let failed_job = job_named("a");
        let running_job = job_named("b");
        store.insert_job(failed_job.clone()).await.unwrap();
        store.insert_job(running_job.clone()).await.unwrap();

        let mut failed_run = JobRun::pending(failed_job.id, "t");
        failed_run.status = RunStatus::Failed;
        let mut running_run = JobRun::pending(running_job.id, "t");
        running_run.status = RunStatus::Running;
        store
            .insert_runs(vec![failed_run, running_run])
            .await
            .unwrap();

        let filter = JobFilter {
            run_status: Some(RunStatus::Failed),
            ..JobFilter::default()
        };
        let jobs = store.list_jobs(&filter).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, failed_job.id);

        // A status no run holds matches nothing.
        let filter = JobFilter {
            run_status: Some(RunStatus::Success),
            ..JobFilter::default()
        };
        assert!(store.list_jobs(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_jobs_skip_and_limit_page_newest_first() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for age in 0..3 {
            let mut job = job_named("a");
            job.created_at = Utc::now() - chrono::Duration::seconds(age);
            ids.push(job.id);
            store.insert_job(job).await.unwrap();
        }

        let filter = JobFilter {
            skip: Some(1),
            limit: Some(1),
            ..JobFilter::default()
        };
        let page = store.list_jobs(&filter).await.unwrap();
        assert_eq!(page.len(), 1);
        // Newest first: skipping one lands on the second-newest job.
        assert_eq!(page[0].id, ids[1]);
    }

    #[tokio::test]
    async fn test_resolve_addrs_skips_unassigned() {
        let store = MemoryStore::new();

        let mut assigned = FleetMember::new("node-01", Role::Worker);
        assigned.overlay_addr = Some(Ipv4Addr::new(10, 77, 0, 1));
        store.insert_member(assigned).await.unwrap();
        store
            .insert_member(FleetMember::new("node-02", Role::Worker))
            .await
            .unwrap();

        let addrs = store
            .resolve_addrs(&["node-01".into(), "node-02".into(), "ghost".into()])
            .await
            .unwrap();
        assert_eq!(addrs.len(), 1);
        assert!(addrs.contains_key("node-01"));
    }
}
