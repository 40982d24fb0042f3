//! Shared test doubles: a scriptable fake fleet standing in for the real
//! agent daemons and stats endpoints.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use armada_agent_client::error::{AgentError, Result as AgentResult};
use armada_agent_client::{AgentApi, StatsApi};
use armada_core::domain::job::RunStatus;
use armada_core::domain::member::Role;
use armada_core::dto::agent::{AgentJobStatus, MachineStats, RunJobRequest};
use armada_core::overlay::SubnetPlan;
use armada_orchestrator::events::JobEventBus;
use armada_orchestrator::service::dispatch::JobDispatchCoordinator;
use armada_orchestrator::service::fleet::FleetRegistry;
use armada_orchestrator::service::script::ScriptCatalog;
use armada_orchestrator::store::{MemoryStore, Store};

/// Scriptable stand-in for the fleet's agent daemons
#[derive(Default)]
pub struct MockAgent {
    /// Addresses whose every call fails as if the member were down
    pub unreachable: Mutex<HashSet<Ipv4Addr>>,
    /// Status answers per address
    pub statuses: Mutex<HashMap<Ipv4Addr, AgentJobStatus>>,
    pub run_calls: Mutex<Vec<(Ipv4Addr, Uuid)>>,
    pub cancel_calls: Mutex<Vec<(Ipv4Addr, Uuid)>>,
    pub report_calls: Mutex<Vec<(Ipv4Addr, Uuid, bool)>>,
}

impl MockAgent {
    pub fn mark_unreachable(&self, addr: Ipv4Addr) {
        self.unreachable.lock().unwrap().insert(addr);
    }

    pub fn set_status(&self, addr: Ipv4Addr, status: RunStatus, exit_code: Option<i32>, log: Option<&str>) {
        self.statuses.lock().unwrap().insert(
            addr,
            AgentJobStatus {
                status,
                exit_code,
                log: log.map(String::from),
                started_at: Some(Utc::now()),
                finished_at: exit_code.map(|_| Utc::now()),
                updated_at: Utc::now(),
            },
        );
    }

    fn check_reachable(&self, addr: Ipv4Addr) -> AgentResult<()> {
        if self.unreachable.lock().unwrap().contains(&addr) {
            // The HTTP client would surface a timeout here; the coordinator
            // only cares that the call errored.
            return Err(AgentError::Api {
                status: 0,
                message: "connection timed out".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AgentApi for MockAgent {
    async fn run_job(&self, addr: Ipv4Addr, job_id: Uuid, _req: &RunJobRequest) -> AgentResult<()> {
        self.check_reachable(addr)?;
        self.run_calls.lock().unwrap().push((addr, job_id));
        Ok(())
    }

    async fn cancel_job(&self, addr: Ipv4Addr, job_id: Uuid) -> AgentResult<()> {
        self.check_reachable(addr)?;
        self.cancel_calls.lock().unwrap().push((addr, job_id));
        Ok(())
    }

    async fn job_status(
        &self,
        addr: Ipv4Addr,
        job_id: Uuid,
        _include_log: bool,
    ) -> AgentResult<AgentJobStatus> {
        self.check_reachable(addr)?;
        self.statuses
            .lock()
            .unwrap()
            .get(&addr)
            .cloned()
            .ok_or(AgentError::JobNotFound(job_id))
    }

    async fn request_report(&self, addr: Ipv4Addr, job_id: Uuid, include_log: bool) -> AgentResult<()> {
        self.check_reachable(addr)?;
        self.report_calls
            .lock()
            .unwrap()
            .push((addr, job_id, include_log));
        Ok(())
    }
}

/// Scriptable stand-in for the fleet's stats endpoints
#[derive(Default)]
pub struct MockStats {
    pub failing: Mutex<HashSet<Ipv4Addr>>,
    pub gauges: Mutex<HashMap<Ipv4Addr, MachineStats>>,
}

impl MockStats {
    pub fn mark_failing(&self, addr: Ipv4Addr) {
        self.failing.lock().unwrap().insert(addr);
    }

    pub fn set_gauges(&self, addr: Ipv4Addr, cpu: f64, memory: f64, disk: f64) {
        self.gauges.lock().unwrap().insert(
            addr,
            MachineStats {
                cpu,
                memory,
                disk,
                last_reported_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl StatsApi for MockStats {
    async fn fetch(&self, addr: Ipv4Addr) -> AgentResult<MachineStats> {
        if self.failing.lock().unwrap().contains(&addr) {
            return Err(AgentError::Api {
                status: 0,
                message: "connection timed out".to_string(),
            });
        }
        self.gauges
            .lock()
            .unwrap()
            .get(&addr)
            .cloned()
            .ok_or_else(|| AgentError::Parse("no gauges configured".to_string()))
    }
}

/// A wired-up orchestrator over in-memory storage and the mock fleet
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub agent: Arc<MockAgent>,
    pub stats: Arc<MockStats>,
    pub events: Arc<JobEventBus>,
    pub coordinator: JobDispatchCoordinator,
    pub registry: FleetRegistry,
    pub scripts: ScriptCatalog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_max_log_bytes(64 * 1024)
    }

    pub fn with_max_log_bytes(max_log_bytes: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let agent = Arc::new(MockAgent::default());
        let stats = Arc::new(MockStats::default());
        let events = Arc::new(JobEventBus::new());

        let coordinator = JobDispatchCoordinator::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&agent) as Arc<dyn AgentApi>,
            Arc::clone(&events),
            max_log_bytes,
        );
        let registry = FleetRegistry::new(
            Arc::clone(&store) as Arc<dyn Store>,
            SubnetPlan::default(),
        );
        let scripts = ScriptCatalog::new(Arc::clone(&store) as Arc<dyn Store>);

        Self {
            store,
            agent,
            stats,
            events,
            coordinator,
            registry,
            scripts,
        }
    }

    /// Register a worker and return its assigned overlay address
    pub async fn register_worker(&self, username: &str) -> Ipv4Addr {
        let member = self.registry.register(username, Role::Worker).await.unwrap();
        member.overlay_addr.unwrap()
    }
}
