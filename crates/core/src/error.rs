use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure categories of the image build pipeline. `as_str` yields the
/// names used by the wire protocol and rendered diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    CannotFindDockerfile,
    ServerError,
    NotFound,
    CommandError,
    UnknownInstruction,
    Unexpected,
}

impl BuildErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildErrorKind::CannotFindDockerfile => "cannot_find_dockerfile",
            BuildErrorKind::ServerError => "server_error",
            BuildErrorKind::NotFound => "not_found",
            BuildErrorKind::CommandError => "command_error",
            // Misspelling preserved from the protocol this was built against.
            BuildErrorKind::UnknownInstruction => "unknow_instruction_error",
            BuildErrorKind::Unexpected => "unexpected_error",
        }
    }
}

impl fmt::Display for BuildErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified image build failure. Carries enough context to render a
/// diagnostic without re-running the build: the Dockerfile path, the last
/// recognized base-image stage and the accumulated raw output.
#[derive(Debug, Clone, Error)]
#[error("docker build failed ({kind}) for {}", dockerfile.display())]
pub struct DockerBuildError {
    pub kind: BuildErrorKind,
    pub dockerfile: PathBuf,
    pub from_stage: Option<String>,
    pub output: String,
    /// Instruction token captured from an "Unknown instruction" message.
    pub instruction: Option<String>,
    /// Underlying cause for submission/server failures.
    pub cause: Option<String>,
}

impl DockerBuildError {
    fn new(kind: BuildErrorKind, dockerfile: &Path) -> Self {
        Self {
            kind,
            dockerfile: dockerfile.to_path_buf(),
            from_stage: None,
            output: String::new(),
            instruction: None,
            cause: None,
        }
    }

    pub fn cannot_find_dockerfile(dockerfile: &Path) -> Self {
        Self::new(BuildErrorKind::CannotFindDockerfile, dockerfile)
    }

    pub fn server_error(dockerfile: &Path, cause: impl fmt::Display) -> Self {
        let mut err = Self::new(BuildErrorKind::ServerError, dockerfile);
        err.cause = Some(cause.to_string());
        err
    }

    pub fn unexpected(dockerfile: &Path, cause: impl fmt::Display) -> Self {
        let mut err = Self::new(BuildErrorKind::Unexpected, dockerfile);
        err.cause = Some(cause.to_string());
        err
    }

    /// Build an error classified from the message stream, attaching the
    /// stage/output context accumulated so far.
    pub fn from_stream(
        kind: BuildErrorKind,
        dockerfile: &Path,
        from_stage: Option<String>,
        output: String,
    ) -> Self {
        let mut err = Self::new(kind, dockerfile);
        err.from_stage = from_stage;
        err.output = output;
        err
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

/// Failures of the scaling engine and dependency resolver.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("system `{system}` depends on `{dependency}`, which has no running instances")]
    DependError { system: String, dependency: String },

    #[error("system `{system}` is not scalable beyond {limit} instances")]
    NotScalable { system: String, limit: i64 },

    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            BuildErrorKind::CannotFindDockerfile.as_str(),
            "cannot_find_dockerfile"
        );
        assert_eq!(
            BuildErrorKind::UnknownInstruction.as_str(),
            "unknow_instruction_error"
        );
        assert_eq!(BuildErrorKind::Unexpected.as_str(), "unexpected_error");
    }

    #[test]
    fn test_build_error_display() {
        let err = DockerBuildError::cannot_find_dockerfile(Path::new("/srv/app/Dockerfile"));
        let rendered = err.to_string();
        assert!(rendered.contains("cannot_find_dockerfile"));
        assert!(rendered.contains("/srv/app/Dockerfile"));
    }

    #[test]
    fn test_stream_error_context() {
        let err = DockerBuildError::from_stream(
            BuildErrorKind::CommandError,
            Path::new("Dockerfile"),
            Some("ubuntu:18.04".to_string()),
            "    apt failed\n".to_string(),
        );
        assert_eq!(err.kind, BuildErrorKind::CommandError);
        assert_eq!(err.from_stage.as_deref(), Some("ubuntu:18.04"));
        assert!(err.output.contains("apt failed"));
    }

    #[test]
    fn test_system_error_messages() {
        let depend = SystemError::DependError {
            system: "web".to_string(),
            dependency: "db".to_string(),
        };
        assert!(depend.to_string().contains("`web`"));
        assert!(depend.to_string().contains("`db`"));

        let limit = SystemError::NotScalable {
            system: "web".to_string(),
            limit: 3,
        };
        assert!(limit.to_string().contains("3 instances"));
    }
}
