//! Core domain types
//!
//! This module contains the core domain structures used across Armada
//! services. These types represent the fundamental business entities and are
//! shared between the orchestrator (for persistence) and the agent client
//! (for wire payloads).

pub mod job;
pub mod member;
pub mod script;
