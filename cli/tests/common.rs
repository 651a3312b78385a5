//! # BuildRun CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every command is
//! run inside a throwaway workspace so that neither a developer's
//! `~/.config/buildrun/config.toml` nor a stray `.buildrun.toml` above the
//! checkout changes the outcome.
//!

// Allow potentially unused code in this common module, as different test files might use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// Command pointing at the compiled `buildrun` binary.
pub fn buildrun_cmd() -> Command {
    Command::cargo_bin("buildrun").expect("Failed to find buildrun binary for testing")
}

/// A temporary workspace: a `.git` marker (ends the project config search),
/// a `home/` used as `$HOME` and `$XDG_CONFIG_HOME`, and a `ctx/` build context.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp workspace");
        fs::create_dir(root.path().join(".git")).expect("Failed to create .git marker");
        fs::create_dir_all(root.path().join("home/.config")).expect("Failed to create home");
        fs::create_dir(root.path().join("ctx")).expect("Failed to create context dir");
        fs::write(root.path().join("ctx/Dockerfile.dev"), "FROM alpine\n")
            .expect("Failed to write Dockerfile");
        Self { root }
    }

    pub fn context(&self) -> String {
        self.root.path().join("ctx").display().to_string()
    }

    /// Writes `.buildrun.toml` at the workspace root.
    pub fn project_config(&self, content: &str) {
        fs::write(self.root.path().join(".buildrun.toml"), content)
            .expect("Failed to write project config");
    }

    /// `buildrun` running inside this workspace with an isolated home.
    pub fn cmd(&self) -> Command {
        let home = self.root.path().join("home");
        let mut cmd = buildrun_cmd();
        cmd.current_dir(self.root.path())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("RUST_LOG")
            .env_remove("BUILDRUN_REGISTRY_USER")
            .env_remove("BUILDRUN_REGISTRY_PASSWORD");
        cmd
    }
}
