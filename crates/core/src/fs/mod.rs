//! Filesystem abstraction for testable file operations.

mod mock;
mod real;

use anyhow::Result;
use std::path::Path;

pub use mock::MockFileSystem;
pub use real::RealFileSystem;

/// The filesystem surface the orchestration core needs: existence checks
/// and whole-file reads. Passed explicitly into the components that touch
/// disk so tests can substitute an in-memory implementation.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
}
