//! Instance-count deltas: compute, enforce limits, resolve dependencies,
//! apply sequentially, report. Each scale call runs under a per-system
//! critical section so the limit invariant holds under concurrent callers.

use crate::balancer::Balancer;
use crate::runtime::{ContainerHost, RunInstanceOptions};
use crate::system::{parse_envs, Instance, System, DAEMON_TYPE};
use crate::tracker::{system_hash, ScaleEvent, Tracker};
use caravel_core::SystemError;
use futures_util::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScaleOptions {
    /// Caller-supplied environment; wins over dependency-exported keys.
    pub envs: BTreeMap<String, String>,
    /// Auto-start dependencies that have no running instances.
    pub dependencies: bool,
    pub pull: bool,
    /// Applied to at most the first launch of a scale call.
    pub provision_force: bool,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            envs: BTreeMap::new(),
            dependencies: true,
            pull: false,
            provision_force: false,
        }
    }
}

pub struct Scaler {
    host: Arc<dyn ContainerHost>,
    balancer: Arc<dyn Balancer>,
    tracker: Arc<dyn Tracker>,
    /// One serialization point per system name, held across the whole
    /// read-count, enforce-limit, apply-delta sequence. Dependency
    /// cascades take the dependency's own entry; cyclic dependency
    /// graphs are rejected by manifest validation before reaching here.
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Scaler {
    pub fn new(
        host: Arc<dyn ContainerHost>,
        balancer: Arc<dyn Balancer>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Self {
            host,
            balancer,
            tracker,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn system_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn instances(&self, system: &System) -> Result<Vec<Instance>, SystemError> {
        Ok(self.host.instances(&system.name, DAEMON_TYPE).await?)
    }

    /// Scale to the system's configured default.
    pub async fn start(&self, system: &System, options: ScaleOptions) -> Result<i64, SystemError> {
        self.scale(system, None, options).await
    }

    /// Scale to `target` instances (the configured default when `None`).
    /// Returns the signed delta actually applied.
    pub fn scale<'a>(
        &'a self,
        system: &'a System,
        target: Option<u32>,
        options: ScaleOptions,
    ) -> BoxFuture<'a, Result<i64, SystemError>> {
        Box::pin(async move {
            let lock = self.system_lock(&system.name);
            let _guard = lock.lock().await;
            self.scale_locked(system, target, options).await
        })
    }

    async fn scale_locked(
        &self,
        system: &System,
        target: Option<u32>,
        options: ScaleOptions,
    ) -> Result<i64, SystemError> {
        let target = i64::from(target.unwrap_or(system.scalable.default));

        let containers = self.instances(system).await?;
        let from = containers.len() as i64;
        let delta = target - from;

        // Protect not-scalable systems before anything is created.
        let limit = system.scalable.limit;
        if limit > 0 && delta > 0 && from + delta > limit {
            return Err(SystemError::NotScalable {
                system: system.name.clone(),
                limit,
            });
        }

        if delta != 0 {
            info!(system = %system.name, from, to = from + delta, "scaling");
        }

        if delta > 0 {
            let deps_envs = self.depend_envs(system, &options).await?;
            let mut envs = deps_envs;
            envs.extend(options.envs.clone());

            let mut run = RunInstanceOptions {
                system: system.name.clone(),
                image: system.image.clone(),
                envs,
                provision_force: options.provision_force,
                pull: options.pull,
            };
            for _ in 0..delta {
                self.host.run_daemon(&run).await?;
                run.provision_force = false;
            }
        } else if delta < 0 {
            // Most recently created go first.
            let mut doomed = containers;
            doomed.sort_by_key(|instance| instance.created_at);
            doomed.reverse();
            doomed.truncate(delta.unsigned_abs() as usize);
            self.host.stop(&doomed, false).await?;
        }

        self.report("scale", system, from as u64, (from + delta) as u64)
            .await;

        Ok(delta)
    }

    /// Resolve each declared dependency in order, auto-starting it when
    /// permitted, and merge the exported environments last-write-wins.
    /// Only the first instance of a dependency is inspected.
    async fn depend_envs(
        &self,
        system: &System,
        options: &ScaleOptions,
    ) -> Result<BTreeMap<String, String>, SystemError> {
        let mut envs = BTreeMap::new();

        for depend in &system.depends {
            let mut instances = self.instances(depend).await?;

            if instances.is_empty() {
                if !options.dependencies {
                    return Err(SystemError::DependError {
                        system: system.name.clone(),
                        dependency: depend.name.clone(),
                    });
                }
                let scale_to = depend.scalable.default.max(1);
                debug!(
                    system = %system.name,
                    dependency = %depend.name,
                    to = scale_to,
                    "auto-starting dependency"
                );
                let cascade = ScaleOptions {
                    dependencies: options.dependencies,
                    pull: options.pull,
                    ..ScaleOptions::default()
                };
                self.scale(depend, Some(scale_to), cascade).await?;
                instances = self.instances(depend).await?;
            }

            if let Some(first) = instances.first() {
                let data = self.host.inspect(&first.id).await?;
                let exported = depend.expand_export_envs(&parse_envs(&data.env), &data.ports);
                envs.extend(exported);
            }
        }

        Ok(envs)
    }

    /// Clear the system's balancer registration, then force-stop every
    /// running instance regardless of scaling policy.
    pub async fn kill_all(&self, system: &System, kill: bool) -> Result<(), SystemError> {
        let lock = self.system_lock(&system.name);
        let _guard = lock.lock().await;

        self.balancer.clear(system).await?;

        let instances = self.instances(system).await?;
        if !instances.is_empty() {
            self.host.stop(&instances, kill).await?;
        }
        Ok(())
    }

    async fn report(&self, event_type: &str, system: &System, from: u64, to: u64) {
        let event = ScaleEvent {
            event_type: event_type.to_string(),
            manifest_id: system.manifest_id.clone(),
            from_count: from,
            to_count: to,
            system_hash: system_hash(&system.manifest_id, &system.name),
        };
        match self.tracker.track("system", &event).await {
            Ok(0) => {}
            Ok(code) => warn!(code, system = %system.name, "telemetry delivery failed"),
            Err(err) => warn!(error = %err, system = %system.name, "telemetry call failed"),
        }
    }
}
