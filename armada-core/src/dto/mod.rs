//! Data transfer objects
//!
//! Payloads exchanged with fleet agents and with the ingress layer. Agent
//! payloads serialize camelCase to match the agent wire protocol.

pub mod agent;
pub mod job;
