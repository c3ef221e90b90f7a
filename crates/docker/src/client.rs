//! Bollard-backed implementation of [`BuildRuntime`]. Runtime-level
//! stream failures are folded into protocol `error` messages so the
//! pipeline classifies them like any other build error.

use crate::protocol::{BuildMessage, ErrorDetail};
use crate::runtime::{BuildMessageStream, BuildRuntime, Image, ImageBuildOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::image::BuildImageOptions;
use bollard::models::BuildInfo;
use bollard::Docker;
use bytes::Bytes;
use caravel_core::CaravelConfig;
use futures_util::StreamExt;
use tracing::debug;

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect to the daemon endpoint from configuration.
    pub fn connect(config: &CaravelConfig) -> Result<Self> {
        let docker = if let Some(path) = config.docker_host.strip_prefix("unix://") {
            Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION)
                .with_context(|| format!("Failed to connect to Docker at {}", config.docker_host))?
        } else {
            Docker::connect_with_local_defaults()
                .context("Failed to connect to Docker with local defaults")?
        };
        Ok(Self { docker })
    }

    pub fn docker(&self) -> &Docker {
        &self.docker
    }
}

fn to_message(info: BuildInfo) -> BuildMessage {
    BuildMessage {
        stream: info.stream,
        error: info.error,
        error_detail: info.error_detail.map(|d| ErrorDetail {
            code: d.code,
            message: d.message,
        }),
        status: info.status,
        id: info.id,
        progress: info.progress,
    }
}

#[async_trait]
impl BuildRuntime for DockerClient {
    async fn build_image(
        &self,
        archive: Bytes,
        options: &ImageBuildOptions,
    ) -> Result<BuildMessageStream<'_>> {
        let build_options = BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_string(),
            t: options.tag.clone(),
            nocache: options.no_cache,
            forcerm: options.force_remove,
            q: options.quiet,
            target: options.target.clone().unwrap_or_default(),
            ..Default::default()
        };

        debug!(tag = %options.tag, "submitting build to docker daemon");
        let stream = self
            .docker
            .build_image(build_options, None, Some(archive));

        let mapped = stream.map(|item| match item {
            Ok(info) => to_message(info),
            Err(err) => BuildMessage::error(err.to_string()),
        });
        Ok(Box::pin(mapped))
    }

    async fn find_image(&self, tag: &str) -> Result<Image> {
        let inspect = self
            .docker
            .inspect_image(tag)
            .await
            .with_context(|| format!("Failed to inspect image {tag}"))?;
        Ok(Image {
            id: inspect.id.unwrap_or_else(|| tag.to_string()),
            tag: tag.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_mapping() {
        let info = BuildInfo {
            stream: Some("Step 1/1 : FROM alpine\n".to_string()),
            ..Default::default()
        };
        let msg = to_message(info);
        assert_eq!(msg.stream.as_deref(), Some("Step 1/1 : FROM alpine\n"));
        assert!(msg.error.is_none());
    }

    #[test]
    fn test_build_info_error_mapping() {
        let info = BuildInfo {
            error: Some("Unknown instruction: FROOM".to_string()),
            ..Default::default()
        };
        let msg = to_message(info);
        assert_eq!(msg.error.as_deref(), Some("Unknown instruction: FROOM"));
    }
}
