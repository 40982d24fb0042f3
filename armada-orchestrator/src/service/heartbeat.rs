//! Fleet heartbeat polling
//!
//! On a fixed interval, snapshots every active member holding an overlay
//! address and polls its stats endpoint concurrently. A successful poll marks
//! the member online, refreshes its gauges and bumps the poll counter; any
//! failure marks it offline and leaves everything else untouched. Each member
//! persists independently, so one bad member never taints a cycle.
//!
//! Live status is disjoint from run state; the poller runs safely alongside
//! dispatch and refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use armada_agent_client::StatsApi;

use crate::store::{Store, StoreError};

/// Outcome tally of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCycle {
    pub polled: usize,
    pub online: usize,
    pub offline: usize,
}

/// Recurring poller for fleet health/resource gauges
pub struct HeartbeatPoller {
    store: Arc<dyn Store>,
    stats: Arc<dyn StatsApi>,
    interval: Duration,
}

impl HeartbeatPoller {
    pub fn new(store: Arc<dyn Store>, stats: Arc<dyn StatsApi>, interval: Duration) -> Self {
        Self {
            store,
            stats,
            interval,
        }
    }

    /// Poll forever on the configured interval
    pub async fn run(&self) {
        tracing::info!(interval = ?self.interval, "starting heartbeat poller");

        let mut ticker = time::interval(self.interval);

        loop {
            ticker.tick().await;

            match self.poll_once().await {
                Ok(cycle) => {
                    tracing::debug!(
                        polled = cycle.polled,
                        online = cycle.online,
                        offline = cycle.offline,
                        "heartbeat cycle completed"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "heartbeat cycle failed");
                }
            }
        }
    }

    /// Run a single poll cycle over the current fleet snapshot
    pub async fn poll_once(&self) -> Result<PollCycle, StoreError> {
        let members: Vec<_> = self
            .store
            .list_active_members()
            .await?
            .into_iter()
            .filter(|m| m.overlay_addr.is_some())
            .collect();

        let mut handles = Vec::with_capacity(members.len());
        for member in members {
            let store = Arc::clone(&self.store);
            let stats = Arc::clone(&self.stats);

            handles.push(tokio::spawn(async move {
                let Some(addr) = member.overlay_addr else {
                    return false;
                };

                let mut live = member.live.clone();
                let online = match stats.fetch(addr).await {
                    Ok(report) => {
                        live.online = true;
                        live.cpu = report.cpu;
                        live.memory = report.memory;
                        live.disk = report.disk;
                        live.last_reported_at = Some(report.last_reported_at);
                        live.poll_count += 1;
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            username = %member.username,
                            %addr,
                            error = %e,
                            "heartbeat poll failed, marking offline"
                        );
                        live.online = false;
                        false
                    }
                };

                if let Err(e) = store.update_live_status(&member.username, live).await {
                    tracing::error!(
                        username = %member.username,
                        error = %e,
                        "failed to persist live status"
                    );
                }

                online
            }));
        }

        let mut cycle = PollCycle::default();
        for handle in handles {
            match handle.await {
                Ok(online) => {
                    cycle.polled += 1;
                    if online {
                        cycle.online += 1;
                    } else {
                        cycle.offline += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("heartbeat task panicked: {}", e);
                }
            }
        }

        Ok(cycle)
    }
}
