//! Armada Orchestrator
//!
//! Job dispatch and fleet-status core. The orchestrator fans a script run out
//! to every targeted fleet member, tracks each member's outcome
//! independently, streams live run updates to subscribers, and keeps the
//! fleet's health gauges fresh through a recurring heartbeat poll.
//!
//! This crate contains:
//! - `store`: the persistence contract plus an in-memory implementation
//! - `events`: the per-job publish/subscribe bus for live run updates
//! - `service`: dispatch coordinator, fleet registry, heartbeat poller and
//!   script catalog
//! - `config`: environment-driven configuration
//!
//! Ingress (HTTP surface, auth) and durable persistence engines are external
//! collaborators; they compose these pieces but live elsewhere.

pub mod config;
pub mod events;
pub mod service;
pub mod store;
