//! # `.dockerignore` Matching
//!
//! File: cli/src/common/archive/dockerignore.rs
//!
//! ## Overview
//!
//! The client, not the daemon, decides which files of the build context are
//! sent. This module reads `<context>/.dockerignore` and answers whether a
//! context-relative path is excluded, using Docker's rules:
//!
//! - one pattern per line, `#` starts a comment, blank lines are skipped;
//! - patterns are anchored at the context root; `*`, `?` and `[...]` stay
//!   within one path segment while `**` crosses segments;
//! - a pattern that matches a directory excludes everything below it;
//! - `!pattern` re-includes, and the last matching line wins.
//!
//! Globbing is delegated to `ignore::gitignore`. Every line is handed over
//! with a leading `/` so that gitignore's "match at any depth" rule for
//! slash-free patterns does not apply.
//!
use crate::core::error::Result;
use anyhow::Context;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::Path;

pub const IGNORE_FILE: &str = ".dockerignore";

/// Compiled `.dockerignore` patterns. Matches nothing when the file does not exist.
#[derive(Debug, Clone)]
pub struct DockerIgnore {
    matcher: Gitignore,
}

impl DockerIgnore {
    /// Reads `.dockerignore` from `context_dir` if present.
    pub fn load(context_dir: &Path) -> Result<Self> {
        let path = context_dir.join(IGNORE_FILE);
        if !path.is_file() {
            return Ok(Self {
                matcher: Gitignore::empty(),
            });
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(context_dir, &content)
            .with_context(|| format!("Invalid pattern in {}", path.display()))
    }

    /// Compiles `.dockerignore` content for the context rooted at `root`.
    pub fn parse(root: &Path, content: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negate, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let pattern = clean(pattern);
            if pattern.is_empty() {
                continue;
            }
            let anchored = format!("{}/{}", if negate { "!" } else { "" }, pattern);
            builder
                .add_line(None, &anchored)
                .with_context(|| format!("Bad pattern '{}'", line))?;
        }
        let matcher = builder
            .build()
            .context("Failed to compile .dockerignore patterns")?;
        Ok(Self { matcher })
    }

    pub fn has_negations(&self) -> bool {
        self.matcher.num_whitelists() > 0
    }

    /// Whether the `/`-separated, context-relative `path` is excluded.
    pub fn is_excluded(&self, path: &str, is_dir: bool) -> bool {
        let path = clean(path);
        if path.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

/// Drops leading `./` and `/` and trailing `/`.
fn clean(mut pattern: &str) -> &str {
    loop {
        if let Some(rest) = pattern.strip_prefix("./") {
            pattern = rest;
        } else if let Some(rest) = pattern.strip_prefix('/') {
            pattern = rest;
        } else {
            break;
        }
    }
    let pattern = pattern.trim_end_matches('/');
    if pattern == "." {
        ""
    } else {
        pattern
    }
}
