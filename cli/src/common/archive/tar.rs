//! # BuildRun TAR Archive Operations (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//!
//! ## Overview
//!
//! Creates the gzipped tarball the Docker daemon expects as a build context.
//!
//! ## Architecture
//!
//! - The context directory is walked with `walkdir`, sorted by file name so
//!   the archive layout is stable between runs.
//! - Paths excluded by `.dockerignore` are skipped. The Dockerfile and the
//!   `.dockerignore` file itself are always sent, as the Docker CLI does.
//! - Entries are written with `tar` into a `flate2` Gzip encoder held in memory.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::tar;
//! use std::path::Path;
//!
//! # fn main() -> crate::core::error::Result<()> {
//! let bytes = tar::create_context_tar(Path::new("./app"), "Dockerfile.dev")?;
//! // docker.build_image(options, None, Some(bytes.into()));
//! # Ok(())
//! # }
//! ```
//!
use super::dockerignore::{DockerIgnore, IGNORE_FILE};
use crate::core::error::Result;
use anyhow::Context;
use flate2::{write::GzEncoder, Compression};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Creates a gzipped TAR archive of `context_path`, honouring `.dockerignore`.
///
/// ## Arguments
///
/// * `context_path` - The directory to archive. Must exist.
/// * `dockerfile` - Dockerfile name relative to `context_path`; never excluded.
///
/// ## Errors
///
/// Returns an `Err` if the directory cannot be walked, a file cannot be added,
/// or the archive/compression stream cannot be finished.
pub fn create_context_tar(context_path: &Path, dockerfile: &str) -> Result<Vec<u8>> {
    let ignore = DockerIgnore::load(context_path)?;
    let can_prune = !ignore.has_negations();
    let always_sent = [dockerfile.trim_start_matches("./"), IGNORE_FILE];

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut entries = WalkDir::new(context_path)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();
    let mut skipped = 0usize;

    while let Some(entry) = entries.next() {
        let entry = entry.with_context(|| {
            format!("Failed to walk build context '{}'", context_path.display())
        })?;
        let relative = entry
            .path()
            .strip_prefix(context_path)
            .with_context(|| format!("'{}' escaped the build context", entry.path().display()))?;
        let relative_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let is_dir = entry.file_type().is_dir();
        if ignore.is_excluded(&relative_str, is_dir)
            && !always_sent.contains(&relative_str.as_str())
        {
            skipped += 1;
            if is_dir && can_prune {
                entries.skip_current_dir();
            }
            continue;
        }

        if is_dir {
            builder
                .append_dir(relative, entry.path())
                .with_context(|| format!("Failed to add directory '{}'", relative_str))?;
        } else {
            builder
                .append_path_with_name(entry.path(), relative)
                .with_context(|| format!("Failed to add file '{}'", relative_str))?;
        }
    }
    debug!("Build context: {} path(s) excluded by .dockerignore", skipped);

    let encoder = builder
        .into_inner()
        .context("Failed to finalize tar archive structure")?;
    encoder
        .finish()
        .context("Failed to finish gzip compression stream")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::collections::HashSet;
    use std::fs;
    use tar::Archive;
    use tempfile::tempdir;

    fn archived_paths(bytes: &[u8]) -> HashSet<String> {
        let mut archive = Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let entry = e.unwrap();
                let path = entry.path().unwrap().to_string_lossy().replace('\\', "/");
                path.trim_end_matches('/').to_string()
            })
            .collect()
    }

    #[test]
    fn test_create_context_tar_basic() -> Result<()> {
        let temp_dir = tempdir()?;
        let dir_path = temp_dir.path();
        fs::write(dir_path.join("Dockerfile.dev"), "FROM alpine")?;
        fs::create_dir(dir_path.join("subdir"))?;
        fs::write(dir_path.join("subdir/file2.txt"), "world")?;

        let paths = archived_paths(&create_context_tar(dir_path, "Dockerfile.dev")?);
        assert!(paths.contains("Dockerfile.dev"));
        assert!(paths.contains("subdir"));
        assert!(paths.contains("subdir/file2.txt"));
        Ok(())
    }

    #[test]
    fn test_dockerignore_excludes_but_keeps_dockerfile() -> Result<()> {
        let temp_dir = tempdir()?;
        let dir_path = temp_dir.path();
        fs::write(dir_path.join(".dockerignore"), "target\nDockerfile*\n*.log\n")?;
        fs::write(dir_path.join("Dockerfile.prod"), "FROM alpine")?;
        fs::write(dir_path.join("Dockerfile.dev"), "FROM alpine")?;
        fs::write(dir_path.join("app.log"), "noise")?;
        fs::create_dir_all(dir_path.join("target/debug"))?;
        fs::write(dir_path.join("target/debug/app"), "bin")?;
        fs::write(dir_path.join("main.py"), "print()")?;

        let paths = archived_paths(&create_context_tar(dir_path, "Dockerfile.prod")?);
        assert!(paths.contains("Dockerfile.prod"));
        assert!(paths.contains(".dockerignore"));
        assert!(paths.contains("main.py"));
        assert!(!paths.contains("Dockerfile.dev"));
        assert!(!paths.contains("app.log"));
        assert!(!paths.contains("target"));
        assert!(!paths.contains("target/debug/app"));
        Ok(())
    }

    #[test]
    fn test_negated_file_inside_ignored_dir_is_kept() -> Result<()> {
        let temp_dir = tempdir()?;
        let dir_path = temp_dir.path();
        fs::write(dir_path.join(".dockerignore"), "docs\n!docs/keep.md\n")?;
        fs::create_dir(dir_path.join("docs"))?;
        fs::write(dir_path.join("docs/keep.md"), "keep")?;
        fs::write(dir_path.join("docs/drop.md"), "drop")?;

        let paths = archived_paths(&create_context_tar(dir_path, "Dockerfile")?);
        assert!(paths.contains("docs/keep.md"));
        assert!(!paths.contains("docs/drop.md"));
        Ok(())
    }

    #[test]
    fn test_character_class_pattern_excludes_matching_files() -> Result<()> {
        let temp_dir = tempdir()?;
        let dir_path = temp_dir.path();
        fs::write(dir_path.join(".dockerignore"), "log[0-9].txt\n")?;
        fs::write(dir_path.join("Dockerfile"), "FROM alpine")?;
        fs::write(dir_path.join("log1.txt"), "one")?;
        fs::write(dir_path.join("logx.txt"), "x")?;

        let paths = archived_paths(&create_context_tar(dir_path, "Dockerfile")?);
        assert!(!paths.contains("log1.txt"));
        assert!(paths.contains("logx.txt"));
        Ok(())
    }
}
