//! Overlay address allocation
//!
//! Each fleet member holds a stable address on the private overlay network,
//! drawn from a per-role pool. Allocation scans offsets above the role's
//! subnet base and takes the first free one, so the result is deterministic
//! for a given assigned set.
//!
//! Allocation itself is pure; callers must serialize allocate-and-persist per
//! role, otherwise two concurrent registrations can race to the same offset.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::member::Role;

/// Default pool size per role (one /24 minus network, base and broadcast)
pub const DEFAULT_POOL_SIZE: u32 = 253;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// No free offset remains within the role's pool bound
    #[error("address space exhausted for role {role} (pool size {pool_size})")]
    AddressSpaceExhausted { role: Role, pool_size: u32 },
}

/// Subnet bases and pool bound for every role
///
/// A closed lookup table: adding a role without extending this table is a
/// compile error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetPlan {
    pub worker_base: Ipv4Addr,
    pub operator_base: Ipv4Addr,
    pub admin_base: Ipv4Addr,
    pub pool_size: u32,
}

impl Default for SubnetPlan {
    fn default() -> Self {
        Self {
            worker_base: Ipv4Addr::new(10, 77, 0, 0),
            operator_base: Ipv4Addr::new(10, 77, 1, 0),
            admin_base: Ipv4Addr::new(10, 77, 2, 0),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl SubnetPlan {
    pub fn base(&self, role: Role) -> Ipv4Addr {
        match role {
            Role::Worker => self.worker_base,
            Role::Operator => self.operator_base,
            Role::Admin => self.admin_base,
        }
    }

    /// Offset of `addr` above the role's base, if it falls inside the pool
    pub fn offset_of(&self, role: Role, addr: Ipv4Addr) -> Option<u32> {
        let base = u32::from(self.base(role));
        let value = u32::from(addr);
        let offset = value.checked_sub(base)?;
        (offset >= 1 && offset <= self.pool_size).then_some(offset)
    }

    /// Allocate the first free offset above the role's base
    ///
    /// Scans offsets `1..=min(assigned.len() + 1, pool_size)`; with every
    /// offset in the pool assigned this fails with
    /// [`OverlayError::AddressSpaceExhausted`].
    pub fn allocate(
        &self,
        role: Role,
        assigned_offsets: &HashSet<u32>,
    ) -> Result<Ipv4Addr, OverlayError> {
        let base = u32::from(self.base(role));
        let upper = (assigned_offsets.len() as u32 + 1).min(self.pool_size);

        for offset in 1..=upper {
            if !assigned_offsets.contains(&offset) {
                return Ok(Ipv4Addr::from(base + offset));
            }
        }

        Err(OverlayError::AddressSpaceExhausted {
            role,
            pool_size: self.pool_size,
        })
    }
}
