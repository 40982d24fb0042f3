//! Script domain model
//!
//! A script is the unit of work dispatched to fleet agents. Agents receive
//! the script name plus the content hash the orchestrator recorded at job
//! creation, so a stale agent cache can be detected on the far side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A named script managed by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    pub content: String,
    /// Hex-encoded SHA-256 of the content, recomputed on every update
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Script {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            name: name.into(),
            hash: script_hash(&content),
            content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content and recompute the hash
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.hash = script_hash(&self.content);
        self.updated_at = Utc::now();
    }
}

/// Hex-encoded SHA-256 of script content
pub fn script_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
