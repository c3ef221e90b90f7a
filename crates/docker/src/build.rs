//! The build pipeline: validate, archive, submit, then drive the message
//! stream strictly in emission order until the completion sentinel or the
//! first error message. Exactly one resolve/reject per invocation.

use crate::archive::build_archive;
use crate::classify::{BuildStage, StreamClassifier};
use crate::runtime::{BuildRuntime, Image, ImageBuildOptions};
use crate::sink::BuildSink;
use caravel_core::{BuildErrorKind, DockerBuildError, FileSystem};
use futures_util::StreamExt;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub dockerfile: PathBuf,
    pub tag: String,
    pub cache: bool,
    pub verbose: bool,
    pub target: Option<String>,
}

impl BuildOptions {
    pub fn new(dockerfile: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            dockerfile: dockerfile.into(),
            tag: tag.into(),
            cache: true,
            verbose: false,
            target: None,
        }
    }
}

/// Build an image from `options.dockerfile`, resolving to the built image
/// looked up by tag once the stream completes, or rejecting with the first
/// classified error. No further stream messages are processed after an
/// error message is resolved.
pub async fn build(
    runtime: &dyn BuildRuntime,
    fs: &dyn FileSystem,
    options: &BuildOptions,
    mut sink: Option<&mut dyn BuildSink>,
) -> Result<Image, DockerBuildError> {
    let dockerfile = options.dockerfile.as_path();

    if !fs.exists(dockerfile) {
        return Err(DockerBuildError::cannot_find_dockerfile(dockerfile));
    }
    if options.tag.trim().is_empty() {
        return Err(DockerBuildError::unexpected(
            dockerfile,
            "cannot build an image with an empty tag",
        ));
    }

    let archive = build_archive(fs, dockerfile, &[])?;
    let build_options = ImageBuildOptions {
        tag: options.tag.clone(),
        force_remove: true,
        no_cache: !options.cache,
        quiet: !options.verbose,
        target: options.target.clone(),
    };

    debug!(tag = %options.tag, bytes = archive.len(), "submitting build context");
    let mut stream = runtime
        .build_image(archive, &build_options)
        .await
        .map_err(|err| DockerBuildError::server_error(dockerfile, &err))?;

    let classifier = StreamClassifier::new();
    let mut from_stage: Option<String> = None;
    let mut output = String::new();
    let mut download_lines = 0usize;

    while let Some(msg) = stream.next().await {
        if let Some(error) = msg.error {
            output.push_str(&error);
            return Err(classify_error(&error, dockerfile, from_stage, output));
        }

        let Some(line) = msg.stream else {
            // Status-only messages: the download progress bar in verbose mode.
            if options.verbose && msg.status.as_deref() == Some("Downloading") {
                if let Some(sink) = sink.as_deref_mut() {
                    write_download_progress(sink, &msg.id, &msg.progress, &mut download_lines);
                }
            }
            continue;
        };

        if let Some(event) = classifier.classify(&line) {
            if event.stage == BuildStage::From {
                from_stage = Some(event.value.clone());
            }
            if options.verbose {
                if let Some(sink) = sink.as_deref_mut() {
                    sink.write_line(&format!("  {line}"));
                }
            }
        }
        output.push_str(&line);
    }

    runtime
        .find_image(&options.tag)
        .await
        .map_err(|err| DockerBuildError::server_error(dockerfile, &err))
}

fn write_download_progress(
    sink: &mut dyn BuildSink,
    id: &Option<String>,
    progress: &Option<String>,
    count: &mut usize,
) {
    let line = format!(
        "- [{}] {}\n",
        id.as_deref().unwrap_or(""),
        progress.as_deref().unwrap_or("")
    );
    if sink.supports_cursor() && *count > 0 {
        sink.overwrite_line(&line);
    } else {
        sink.write_line(&line);
    }
    *count += 1;
}

/// Classify an `error` message, in fixed precedence order. The first two
/// patterns win over "Unknown instruction" when a message matches several.
fn classify_error(
    message: &str,
    dockerfile: &Path,
    from_stage: Option<String>,
    output: String,
) -> DockerBuildError {
    let not_found = Regex::new(r"image .* not found").expect("valid regex");
    let non_zero = Regex::new(r"returned a non-zero code").expect("valid regex");
    let unknown = Regex::new(r"Unknown instruction: (.*)").expect("valid regex");

    if not_found.is_match(message) {
        DockerBuildError::from_stream(BuildErrorKind::NotFound, dockerfile, from_stage, output)
    } else if non_zero.is_match(message) {
        DockerBuildError::from_stream(
            BuildErrorKind::CommandError,
            dockerfile,
            from_stage,
            indent(&output),
        )
    } else if let Some(caps) = unknown.captures(message) {
        DockerBuildError::from_stream(
            BuildErrorKind::UnknownInstruction,
            dockerfile,
            from_stage,
            output,
        )
        .with_instruction(caps[1].trim())
    } else {
        DockerBuildError::from_stream(
            BuildErrorKind::Unexpected,
            dockerfile,
            from_stage,
            indent(&output),
        )
    }
}

/// Re-indent accumulated output for readability in diagnostics: four
/// spaces in front of every line.
fn indent(output: &str) -> String {
    let mut indented = String::with_capacity(output.len());
    for (i, line) in output.split('\n').enumerate() {
        if i > 0 {
            indented.push('\n');
        }
        if !line.is_empty() {
            indented.push_str("    ");
            indented.push_str(line);
        }
    }
    indented
}
