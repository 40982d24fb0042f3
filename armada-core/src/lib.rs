//! Armada Core
//!
//! Core types and abstractions for the Armada fleet-control system.
//!
//! This crate contains:
//! - Domain types: Core business entities (FleetMember, Job, JobRun, Script)
//! - DTOs: Data transfer objects exchanged with fleet agents and ingress
//! - Overlay address allocation for fleet members
//! - Log truncation applied before run output is stored or transmitted

pub mod domain;
pub mod dto;
pub mod overlay;
pub mod truncate;
