//! The abstract build-side surface of the container runtime. The pipeline
//! depends on this trait, not on a concrete client, so tests can script
//! message streams.

use crate::protocol::BuildMessage;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// Ordered stream of protocol messages; exhaustion is the completion
/// sentinel.
pub type BuildMessageStream<'a> = Pin<Box<dyn Stream<Item = BuildMessage> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct Image {
    pub id: String,
    pub tag: String,
}

/// Options submitted alongside the build context.
#[derive(Debug, Clone, Default)]
pub struct ImageBuildOptions {
    pub tag: String,
    pub force_remove: bool,
    pub no_cache: bool,
    pub quiet: bool,
    pub target: Option<String>,
}

#[async_trait]
pub trait BuildRuntime: Send + Sync {
    /// Submit a build context archive. Errors here are submission
    /// failures (daemon unreachable, bad request), distinct from errors
    /// reported inside the returned stream.
    async fn build_image(
        &self,
        archive: Bytes,
        options: &ImageBuildOptions,
    ) -> Result<BuildMessageStream<'_>>;

    /// Look up a built image by tag.
    async fn find_image(&self, tag: &str) -> Result<Image>;
}
