//! Service layer
//!
//! Business logic over the store, the agent client and the event bus:
//! - `dispatch`: job/run lifecycle (create, cancel, refresh, agent updates)
//! - `fleet`: member registration and overlay address assignment
//! - `heartbeat`: recurring fleet health/resource polling
//! - `script`: the script catalog jobs draw from

pub mod dispatch;
pub mod fleet;
pub mod heartbeat;
pub mod script;
