//! Orchestrator configuration
//!
//! Defines all configurable parameters for the orchestrator including agent
//! and stats ports, call timeouts, the heartbeat interval, the run-log size
//! bound and the overlay subnet plan.

use std::net::Ipv4Addr;
use std::time::Duration;

use armada_core::overlay::SubnetPlan;

/// Default per-call agent timeout in milliseconds
const DEFAULT_AGENT_TIMEOUT_MS: u64 = 5000;

/// Default heartbeat interval in seconds
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Default run-log bound in bytes
const DEFAULT_MAX_LOG_BYTES: usize = 64 * 1024;

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable to allow tuning for different
/// deployment scenarios (dev vs prod, fast vs slow overlay links).
#[derive(Debug, Clone)]
pub struct Config {
    /// Port of the agent daemon on every fleet member
    pub agent_port: u16,

    /// Port of the stats endpoint on every fleet member
    pub stats_port: u16,

    /// Fixed timeout applied to every individual agent/stats call
    pub agent_timeout: Duration,

    /// How often the heartbeat poller cycles over the fleet
    pub heartbeat_interval: Duration,

    /// Byte bound applied to run logs before storage or transport
    pub max_log_bytes: usize,

    /// Per-role overlay subnet bases and pool bound
    pub subnets: SubnetPlan,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - ARMADA_AGENT_PORT (default: 9010)
    /// - ARMADA_STATS_PORT (default: 9100)
    /// - ARMADA_AGENT_TIMEOUT_MS (default: 5000)
    /// - ARMADA_HEARTBEAT_INTERVAL_SECS (default: 30)
    /// - ARMADA_MAX_LOG_BYTES (default: 65536)
    /// - ARMADA_WORKER_SUBNET_BASE (default: 10.77.0.0)
    /// - ARMADA_OPERATOR_SUBNET_BASE (default: 10.77.1.0)
    /// - ARMADA_ADMIN_SUBNET_BASE (default: 10.77.2.0)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let agent_port = env_parsed("ARMADA_AGENT_PORT")?.unwrap_or(defaults.agent_port);
        let stats_port = env_parsed("ARMADA_STATS_PORT")?.unwrap_or(defaults.stats_port);

        let agent_timeout = env_parsed::<u64>("ARMADA_AGENT_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.agent_timeout);

        let heartbeat_interval = env_parsed::<u64>("ARMADA_HEARTBEAT_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_interval);

        let max_log_bytes =
            env_parsed("ARMADA_MAX_LOG_BYTES")?.unwrap_or(defaults.max_log_bytes);

        let subnets = SubnetPlan {
            worker_base: env_parsed::<Ipv4Addr>("ARMADA_WORKER_SUBNET_BASE")?
                .unwrap_or(defaults.subnets.worker_base),
            operator_base: env_parsed::<Ipv4Addr>("ARMADA_OPERATOR_SUBNET_BASE")?
                .unwrap_or(defaults.subnets.operator_base),
            admin_base: env_parsed::<Ipv4Addr>("ARMADA_ADMIN_SUBNET_BASE")?
                .unwrap_or(defaults.subnets.admin_base),
            ..defaults.subnets
        };

        let config = Self {
            agent_port,
            stats_port,
            agent_timeout,
            heartbeat_interval,
            max_log_bytes,
            subnets,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_port == 0 {
            anyhow::bail!("agent_port must be greater than 0");
        }

        if self.stats_port == 0 {
            anyhow::bail!("stats_port must be greater than 0");
        }

        if self.agent_timeout.is_zero() {
            anyhow::bail!("agent_timeout must be greater than 0");
        }

        if self.heartbeat_interval.is_zero() {
            anyhow::bail!("heartbeat_interval must be greater than 0");
        }

        if self.max_log_bytes == 0 {
            anyhow::bail!("max_log_bytes must be greater than 0");
        }

        if self.subnets.pool_size == 0 {
            anyhow::bail!("subnet pool_size must be greater than 0");
        }

        let bases = [
            self.subnets.worker_base,
            self.subnets.operator_base,
            self.subnets.admin_base,
        ];
        for (i, a) in bases.iter().enumerate() {
            for b in &bases[i + 1..] {
                let gap = u32::from(*a).abs_diff(u32::from(*b));
                if gap <= self.subnets.pool_size {
                    anyhow::bail!("subnet bases {} and {} overlap within the pool bound", a, b);
                }
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_port: armada_agent_client::DEFAULT_AGENT_PORT,
            stats_port: armada_agent_client::DEFAULT_STATS_PORT,
            agent_timeout: Duration::from_millis(DEFAULT_AGENT_TIMEOUT_MS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
            subnets: SubnetPlan::default(),
        }
    }
}

fn env_parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => {
            let value = raw
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}
