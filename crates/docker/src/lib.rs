//! Docker image build pipeline: build context archiving, progress stream
//! classification, and the build operation that ties them to a runtime.

pub mod archive;
pub mod build;
pub mod classify;
pub mod client;
pub mod protocol;
pub mod runtime;
pub mod sink;

pub use archive::{build_archive, parse_ignore_file};
pub use build::{build, BuildOptions};
pub use classify::{BuildStage, StageEvent, StreamClassifier};
pub use client::DockerClient;
pub use protocol::{BuildMessage, ErrorDetail};
pub use runtime::{BuildMessageStream, BuildRuntime, Image, ImageBuildOptions};
pub use sink::{BuildSink, WriterSink};
