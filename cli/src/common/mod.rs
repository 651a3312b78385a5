//! # BuildRun Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared utilities used by the stages in `commands`:
//!
//! - **`archive`**: build-context tarball creation, with `.dockerignore` support.
//! - **`docker`**: the `Engine` trait and its `bollard`-backed implementation.
//! - **`ui`**: verbosity-gated progress output on stdout.
//!

/// Build-context archives.
pub mod archive;
/// Everything that talks to the Docker daemon.
pub mod docker;
/// Terminal progress output.
pub mod ui;
