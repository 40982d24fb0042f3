//! Agent daemon endpoints
//!
//! One agent per fleet member at `http://<overlay-addr>:<agent-port>`:
//! run, cancel, status and report. Cancelling an already-terminal job is a
//! no-op the agent accepts.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use armada_core::dto::agent::{AgentJobStatus, AgentReportRequest, RunJobRequest};

use crate::error::{AgentError, Result};

/// Operations exposed by a fleet member's agent daemon
///
/// The orchestrator depends on this trait so tests can stand in a fake fleet
/// without a network.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Ask the agent to start executing a script
    ///
    /// Returns once the agent has accepted the start; completion is observed
    /// later through [`AgentApi::job_status`] or a pushed report.
    async fn run_job(&self, addr: Ipv4Addr, job_id: Uuid, req: &RunJobRequest) -> Result<()>;

    /// Ask the agent to cancel a job; idempotent on the agent side
    async fn cancel_job(&self, addr: Ipv4Addr, job_id: Uuid) -> Result<()>;

    /// Fetch the agent's view of a run
    async fn job_status(
        &self,
        addr: Ipv4Addr,
        job_id: Uuid,
        include_log: bool,
    ) -> Result<AgentJobStatus>;

    /// Ask the agent to push an asynchronous status update later
    async fn request_report(&self, addr: Ipv4Addr, job_id: Uuid, include_log: bool) -> Result<()>;
}

/// HTTP implementation of [`AgentApi`]
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: Client,
    port: u16,
    timeout: Duration,
}

impl HttpAgentClient {
    /// Create a client for agents listening on `port`
    ///
    /// `timeout` bounds every individual call; a timeout surfaces as
    /// [`AgentError::Unreachable`] for that target only.
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            port,
            timeout,
        }
    }

    fn base_url(&self, addr: Ipv4Addr) -> String {
        format!("http://{}:{}", addr, self.port)
    }

    /// Check the status code and decode a JSON body
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        job_id: Uuid,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::JobNotFound(job_id));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))
    }

    /// Check the status code of a call that returns no body
    async fn handle_empty_response(&self, job_id: Uuid, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::JobNotFound(job_id));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AgentApi for HttpAgentClient {
    async fn run_job(&self, addr: Ipv4Addr, job_id: Uuid, req: &RunJobRequest) -> Result<()> {
        let url = format!("{}/jobs/{}/run", self.base_url(addr), job_id);
        tracing::debug!(%addr, %job_id, script = %req.script_name, "dispatching run to agent");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(req)
            .send()
            .await?;

        self.handle_empty_response(job_id, response).await
    }

    async fn cancel_job(&self, addr: Ipv4Addr, job_id: Uuid) -> Result<()> {
        let url = format!("{}/jobs/{}/cancel", self.base_url(addr), job_id);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        self.handle_empty_response(job_id, response).await
    }

    async fn job_status(
        &self,
        addr: Ipv4Addr,
        job_id: Uuid,
        include_log: bool,
    ) -> Result<AgentJobStatus> {
        let url = format!("{}/jobs/{}", self.base_url(addr), job_id);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(&[("includeLog", if include_log { "true" } else { "false" })])
            .send()
            .await?;

        self.handle_response(job_id, response).await
    }

    async fn request_report(&self, addr: Ipv4Addr, job_id: Uuid, include_log: bool) -> Result<()> {
        let url = format!("{}/jobs/{}/report", self.base_url(addr), job_id);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&AgentReportRequest { include_log })
            .send()
            .await?;

        self.handle_empty_response(job_id, response).await
    }
}
