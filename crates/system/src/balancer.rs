//! Load-balancer registration, an external collaborator. `kill_all`
//! clears a system's registration before stopping its instances.

use crate::system::System;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Balancer: Send + Sync {
    async fn clear(&self, system: &System) -> Result<()>;
}

/// Balancer for deployments without one.
pub struct NullBalancer;

#[async_trait]
impl Balancer for NullBalancer {
    async fn clear(&self, _system: &System) -> Result<()> {
        Ok(())
    }
}
