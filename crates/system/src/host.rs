//! Bollard-backed implementation of [`ContainerHost`]. Instances are
//! plain containers labeled with their owning system and type tag.

use crate::runtime::{ContainerHost, RunInstanceOptions};
use crate::system::{Instance, InstanceData, DAEMON_TYPE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, KillContainerOptions,
    ListContainersOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const SYSTEM_LABEL: &str = "caravel.system";
const TYPE_LABEL: &str = "caravel.type";
const STOP_TIMEOUT_SECS: i64 = 10;

pub struct DockerHost {
    docker: Docker,
}

impl DockerHost {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerHost for DockerHost {
    async fn instances(&self, system: &str, instance_type: &str) -> Result<Vec<Instance>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![
                format!("{SYSTEM_LABEL}={system}"),
                format!("{TYPE_LABEL}={instance_type}"),
            ],
        );

        let summaries = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                filters,
                ..Default::default()
            }))
            .await
            .with_context(|| format!("Failed to list instances of {system}"))?;

        let mut instances: Vec<Instance> = summaries
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                Some(Instance {
                    id,
                    system: system.to_string(),
                    instance_type: instance_type.to_string(),
                    created_at: summary.created.unwrap_or(0),
                })
            })
            .collect();
        instances.sort_by_key(|instance| instance.created_at);
        Ok(instances)
    }

    async fn run_daemon(&self, options: &RunInstanceOptions) -> Result<Instance> {
        if options.pull {
            debug!(image = %options.image, "pulling image before launch");
            self.docker
                .create_image(
                    Some(CreateImageOptions::<String> {
                        from_image: options.image.clone(),
                        ..Default::default()
                    }),
                    None,
                    None,
                )
                .try_collect::<Vec<_>>()
                .await
                .with_context(|| format!("Failed to pull image {}", options.image))?;
        }

        let mut labels = HashMap::new();
        labels.insert(SYSTEM_LABEL.to_string(), options.system.clone());
        labels.insert(TYPE_LABEL.to_string(), DAEMON_TYPE.to_string());

        let env: Vec<String> = options
            .envs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        let name = format!("caravel-{}-{}", options.system, Uuid::new_v4().simple());
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                Config {
                    image: Some(options.image.clone()),
                    env: Some(env),
                    labels: Some(labels),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("Failed to create instance {name}"))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .with_context(|| format!("Failed to start instance {name}"))?;

        debug!(system = %options.system, id = %created.id, "instance started");
        Ok(Instance {
            id: created.id,
            system: options.system.clone(),
            instance_type: DAEMON_TYPE.to_string(),
            created_at: 0,
        })
    }

    async fn stop(&self, instances: &[Instance], kill: bool) -> Result<()> {
        for instance in instances {
            if kill {
                self.docker
                    .kill_container(&instance.id, None::<KillContainerOptions<String>>)
                    .await
                    .with_context(|| format!("Failed to kill instance {}", instance.id))?;
            } else {
                self.docker
                    .stop_container(
                        &instance.id,
                        Some(StopContainerOptions {
                            t: STOP_TIMEOUT_SECS,
                        }),
                    )
                    .await
                    .with_context(|| format!("Failed to stop instance {}", instance.id))?;
            }
            debug!(id = %instance.id, kill, "instance stopped");
        }
        Ok(())
    }

    async fn inspect(&self, id: &str) -> Result<InstanceData> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .with_context(|| format!("Failed to inspect instance {id}"))?;

        let mut data = InstanceData::default();

        if let Some(ports) = inspect.network_settings.and_then(|ns| ns.ports) {
            for (exposed, bindings) in ports {
                // "3306/tcp" -> port name "3306"
                let name = exposed
                    .split('/')
                    .next()
                    .unwrap_or(exposed.as_str())
                    .to_string();
                let host_port = bindings
                    .and_then(|mut b| b.pop())
                    .and_then(|binding| binding.host_port)
                    .and_then(|port| port.parse::<u16>().ok());
                if let Some(port) = host_port {
                    data.ports.insert(name, port);
                }
            }
        }

        if let Some(env) = inspect.config.and_then(|c| c.env) {
            data.env = env;
        }

        Ok(data)
    }
}
