//! The instance-side surface of the container runtime, as the scaling
//! engine consumes it. Instance lists are always re-queried, never cached.

use crate::system::{Instance, InstanceData};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Options for launching one daemon instance.
#[derive(Debug, Clone, Default)]
pub struct RunInstanceOptions {
    pub system: String,
    pub image: String,
    pub envs: BTreeMap<String, String>,
    /// One-shot flag: re-run provisioning even if already provisioned.
    /// The scaling engine clears it after the first launch of a batch.
    pub provision_force: bool,
    /// Pull the image before launching.
    pub pull: bool,
}

#[async_trait]
pub trait ContainerHost: Send + Sync {
    /// Current instances of a system with the given type tag.
    async fn instances(&self, system: &str, instance_type: &str) -> Result<Vec<Instance>>;

    /// Launch one daemon instance.
    async fn run_daemon(&self, options: &RunInstanceOptions) -> Result<Instance>;

    /// Stop the given instances; `kill` forces immediate termination.
    async fn stop(&self, instances: &[Instance], kill: bool) -> Result<()>;

    /// Inspect one instance's network and environment data.
    async fn inspect(&self, id: &str) -> Result<InstanceData>;
}
