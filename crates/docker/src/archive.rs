//! Build context assembly: the Dockerfile's directory packed into a tar
//! archive, honoring `.dockerignore` exclusions.

use bytes::Bytes;
use caravel_core::{DockerBuildError, FileSystem};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::Path;
use tracing::debug;

/// Parse `.dockerignore` content into exclusion patterns: lines trimmed,
/// blanks and `#` comments dropped, duplicates removed preserving order.
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !patterns.iter().any(|p| p == line) {
            patterns.push(line.to_string());
        }
    }
    patterns
}

/// Assemble the build context for `dockerfile` into a tar archive.
///
/// The context root is the Dockerfile's containing directory. Every file,
/// dotfiles included, is part of the context unless excluded by
/// `extra_excludes` or a `.dockerignore` entry. The Dockerfile itself and
/// the `.dockerignore` file are excluded from the scan and appended as
/// explicitly named entries, so the archive contains exactly one of each
/// under its canonical name no matter what the patterns say.
pub fn build_archive(
    fs: &dyn FileSystem,
    dockerfile: &Path,
    extra_excludes: &[String],
) -> Result<Bytes, DockerBuildError> {
    if !fs.exists(dockerfile) {
        return Err(DockerBuildError::cannot_find_dockerfile(dockerfile));
    }

    let context = dockerfile.parent().unwrap_or_else(|| Path::new("."));

    let mut excludes: Vec<String> =
        vec!["/Dockerfile".to_string(), "/.dockerignore".to_string()];
    for pattern in extra_excludes {
        if !excludes.contains(pattern) {
            excludes.push(pattern.clone());
        }
    }

    let ignore_path = context.join(".dockerignore");
    let has_ignore = fs.is_file(&ignore_path);
    if has_ignore {
        let content = fs
            .read_to_string(&ignore_path)
            .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
        for pattern in parse_ignore_file(&content) {
            if !excludes.contains(&pattern) {
                excludes.push(pattern);
            }
        }
    }

    debug!(
        context = %context.display(),
        excludes = excludes.len(),
        "assembling build context"
    );

    let mut overrides = OverrideBuilder::new(context);
    for pattern in &excludes {
        overrides
            .add(&format!("!{pattern}"))
            .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
    }
    let overrides = overrides
        .build()
        .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;

    let walker = WalkBuilder::new(context)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .overrides(overrides)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut builder = tar::Builder::new(Vec::new());
    for entry in walker {
        let entry = entry.map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(context)
            .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
        builder
            .append_path_with_name(entry.path(), relative)
            .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
    }

    // Explicit entries, independent of the scan. A Dockerfile with a
    // non-canonical on-disk name still lands in the archive as `Dockerfile`.
    builder
        .append_path_with_name(dockerfile, "Dockerfile")
        .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
    if has_ignore {
        builder
            .append_path_with_name(&ignore_path, ".dockerignore")
            .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
    }

    let data = builder
        .into_inner()
        .map_err(|err| DockerBuildError::unexpected(dockerfile, &err))?;
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravel_core::{BuildErrorKind, RealFileSystem};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn entry_names(archive: &Bytes) -> Vec<String> {
        let mut reader = tar::Archive::new(archive.as_ref());
        reader
            .entries()
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_missing_dockerfile() {
        let err = build_archive(
            &RealFileSystem::new(),
            &PathBuf::from("/nonexistent/Dockerfile"),
            &[],
        )
        .unwrap_err();
        assert_eq!(err.kind, BuildErrorKind::CannotFindDockerfile);
    }

    #[test]
    fn test_archive_contains_context_and_dockerfile() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Dockerfile", "FROM alpine\n");
        write(&dir, "app.py", "print('hi')\n");
        write(&dir, ".env", "SECRET=1\n");
        write(&dir, "src/lib.py", "\n");

        let archive = build_archive(
            &RealFileSystem::new(),
            &dir.path().join("Dockerfile"),
            &[],
        )
        .unwrap();
        let names = entry_names(&archive);

        assert!(names.contains(&"app.py".to_string()));
        assert!(names.contains(&".env".to_string()), "dotfiles are included");
        assert!(names.contains(&"src/lib.py".to_string()));
        assert_eq!(
            names.iter().filter(|n| *n == "Dockerfile").count(),
            1,
            "exactly one Dockerfile entry"
        );
    }

    #[test]
    fn test_dockerignore_exclusions() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Dockerfile", "FROM alpine\n");
        write(&dir, ".dockerignore", "# comment\n\nfoo\n");
        write(&dir, "foo", "excluded\n");
        write(&dir, "bar", "included\n");

        let archive = build_archive(
            &RealFileSystem::new(),
            &dir.path().join("Dockerfile"),
            &[],
        )
        .unwrap();
        let names = entry_names(&archive);

        assert!(names.contains(&"Dockerfile".to_string()));
        assert!(
            names.contains(&".dockerignore".to_string()),
            "ignore file itself is shipped"
        );
        assert!(!names.contains(&"foo".to_string()), "ignored file excluded");
        assert!(names.contains(&"bar".to_string()));
        assert_eq!(names.iter().filter(|n| *n == ".dockerignore").count(), 1);
    }

    #[test]
    fn test_extra_excludes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Dockerfile", "FROM alpine\n");
        write(&dir, "secret.key", "\n");
        write(&dir, "main.go", "\n");

        let archive = build_archive(
            &RealFileSystem::new(),
            &dir.path().join("Dockerfile"),
            &["*.key".to_string()],
        )
        .unwrap();
        let names = entry_names(&archive);

        assert!(!names.contains(&"secret.key".to_string()));
        assert!(names.contains(&"main.go".to_string()));
    }

    #[test]
    fn test_renamed_dockerfile_is_canonicalized() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Dockerfile.dev", "FROM alpine\n");
        write(&dir, "app.py", "\n");

        let archive = build_archive(
            &RealFileSystem::new(),
            &dir.path().join("Dockerfile.dev"),
            &[],
        )
        .unwrap();
        let names = entry_names(&archive);

        assert_eq!(names.iter().filter(|n| *n == "Dockerfile").count(), 1);
        // The on-disk name also appears as a regular context file.
        assert!(names.contains(&"Dockerfile.dev".to_string()));
    }

    #[test]
    fn test_parse_ignore_file() {
        let patterns = parse_ignore_file("# header\n\n  foo  \nbar\nfoo\n");
        assert_eq!(patterns, vec!["foo".to_string(), "bar".to_string()]);
    }
}
