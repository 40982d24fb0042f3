//! Per-member stats endpoint
//!
//! Each fleet member exposes a local stats endpoint returning cpu/memory/disk
//! gauges. The heartbeat poller hits it on a fixed interval; any failure
//! (timeout, refused connection, malformed payload) marks the member offline
//! for that cycle.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use armada_core::dto::agent::MachineStats;

use crate::error::{AgentError, Result};

/// Stats endpoint of a fleet member
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Fetch the member's current resource gauges
    async fn fetch(&self, addr: Ipv4Addr) -> Result<MachineStats>;
}

/// HTTP implementation of [`StatsApi`]
#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    client: Client,
    port: u16,
    timeout: Duration,
}

impl HttpStatsClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl StatsApi for HttpStatsClient {
    async fn fetch(&self, addr: Ipv4Addr) -> Result<MachineStats> {
        let url = format!("http://{}:{}", addr, self.port);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
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
}
