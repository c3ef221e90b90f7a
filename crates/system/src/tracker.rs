//! Scale telemetry. Fire-and-forget: a failed or non-zero delivery is
//! logged by the caller, never surfaced as an operation failure.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One scale event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleEvent {
    pub event_type: String,
    pub manifest_id: String,
    pub from_count: u64,
    pub to_count: u64,
    pub system_hash: String,
}

/// Short stable identifier for a system within its manifest, safe to ship
/// to a telemetry backend without leaking names.
pub fn system_hash(manifest_id: &str, name: &str) -> String {
    let digest = Sha256::digest(format!("{manifest_id}{name}").as_bytes());
    hex::encode(digest)[..8].to_string()
}

#[async_trait]
pub trait Tracker: Send + Sync {
    /// Deliver one event under a domain. Returns the backend's result
    /// code; non-zero means the event was not accepted.
    async fn track(&self, domain: &str, event: &ScaleEvent) -> Result<i64>;
}

/// Tracker that accepts and drops everything.
pub struct NullTracker;

#[async_trait]
impl Tracker for NullTracker {
    async fn track(&self, _domain: &str, _event: &ScaleEvent) -> Result<i64> {
        Ok(0)
    }
}
