pub mod config;
pub mod error;
pub mod fs;

pub use config::CaravelConfig;
pub use error::{BuildErrorKind, DockerBuildError, SystemError};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
