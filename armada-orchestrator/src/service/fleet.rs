//! Fleet registry
//!
//! Enrolls machines into the fleet and assigns each one a stable overlay
//! address from its role's pool. Allocation and persist happen under one
//! async lock, so two concurrent registrations cannot race to the same
//! offset. A collision surfacing anyway is a consistency bug: it is logged
//! and returned, never silently repaired.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use armada_core::domain::member::{FleetMember, Role};
use armada_core::overlay::{OverlayError, SubnetPlan};

use crate::store::{Store, StoreError};

pub type Result<T> = std::result::Result<T, FleetError>;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("member {0} already exists")]
    MemberExists(String),

    #[error("member {0} not found")]
    MemberNotFound(String),

    /// Serialized allocation should make this impossible; treat as a bug
    #[error("overlay address collision for member {0}")]
    AddressCollision(String),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Registry of fleet members and their overlay addresses
pub struct FleetRegistry {
    store: Arc<dyn Store>,
    plan: SubnetPlan,
    /// Serializes allocate-and-persist across registrations and role changes
    alloc_lock: Mutex<()>,
}

impl FleetRegistry {
    pub fn new(store: Arc<dyn Store>, plan: SubnetPlan) -> Self {
        Self {
            store,
            plan,
            alloc_lock: Mutex::new(()),
        }
    }

    /// Enroll a new member and assign it an address from its role's pool
    pub async fn register(&self, username: &str, role: Role) -> Result<FleetMember> {
        let _guard = self.alloc_lock.lock().await;

        if self.store.get_member(username).await?.is_some() {
            return Err(FleetError::MemberExists(username.to_string()));
        }

        let assigned = self.assigned_offsets(role).await?;
        let addr = self.plan.allocate(role, &assigned)?;

        let mut member = FleetMember::new(username, role);
        member.overlay_addr = Some(addr);

        match self.store.insert_member(member.clone()).await {
            Ok(()) => {
                tracing::info!(username, %role, %addr, "fleet member registered");
                Ok(member)
            }
            Err(StoreError::Conflict(msg)) => {
                // The username was free a moment ago under this same lock, so
                // the conflict can only be the address.
                tracing::error!(username, %addr, conflict = %msg, "overlay address collision despite serialized allocation");
                Err(FleetError::AddressCollision(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move a member to a new role, reallocating from the new role's pool
    pub async fn change_role(&self, username: &str, new_role: Role) -> Result<FleetMember> {
        let _guard = self.alloc_lock.lock().await;

        let mut member = self
            .store
            .get_member(username)
            .await?
            .ok_or_else(|| FleetError::MemberNotFound(username.to_string()))?;

        if member.role == new_role && member.overlay_addr.is_some() {
            return Ok(member);
        }

        let assigned = self.assigned_offsets(new_role).await?;
        let addr = self.plan.allocate(new_role, &assigned)?;

        member.role = new_role;
        member.overlay_addr = Some(addr);

        match self.store.update_member(member.clone()).await {
            Ok(()) => {
                tracing::info!(username, role = %new_role, %addr, "fleet member reassigned");
                Ok(member)
            }
            Err(StoreError::Conflict(msg)) => {
                tracing::error!(username, %addr, conflict = %msg, "overlay address collision despite serialized allocation");
                Err(FleetError::AddressCollision(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a member inactive; its address stays reserved
    pub async fn deactivate(&self, username: &str) -> Result<FleetMember> {
        let mut member = self
            .store
            .get_member(username)
            .await?
            .ok_or_else(|| FleetError::MemberNotFound(username.to_string()))?;

        member.active = false;
        self.store.update_member(member.clone()).await?;

        tracing::info!(username, "fleet member deactivated");
        Ok(member)
    }

    pub async fn get(&self, username: &str) -> Result<FleetMember> {
        self.store
            .get_member(username)
            .await?
            .ok_or_else(|| FleetError::MemberNotFound(username.to_string()))
    }

    pub async fn list_active(&self) -> Result<Vec<FleetMember>> {
        Ok(self.store.list_active_members().await?)
    }

    /// Offsets already taken within a role's pool, active members or not
    async fn assigned_offsets(&self, role: Role) -> Result<HashSet<u32>> {
        let members = self.store.members_by_role(role).await?;
        Ok(members
            .iter()
            .filter_map(|m| self.plan.offset_of(role, m.overlay_addr?))
            .collect())
    }
}
