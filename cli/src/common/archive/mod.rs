//! # BuildRun Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! Produces the build context sent to the Docker daemon.
//!
//! - **`tar`**: gzipped tarball of the context directory.
//! - **`dockerignore`**: `.dockerignore` loading and matching used by `tar`.
//!

pub mod dockerignore;
pub mod tar;
