//! # BuildRun Docker Module Interface
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything that talks to the Docker daemon. Stages depend only on the
//! `Engine` trait re-exported here; the `bollard`-specific code is split over
//! the submodules below.
//!
//! ## Architecture
//!
//! - **`engine`**: the `Engine` trait, the crate-owned records it exchanges, and `DockerEngine`.
//! - **`connect`**: opens and pings the daemon connection.
//! - **`state`**: container listing by exact name.
//! - **`lifecycle`**: stop and rename.
//! - **`operations`**: build, run, tag and push.
//! - **`interaction`**: following an attached container until it exits.
//! - **`mappings`**: parsing of `--port` / `--volume` syntax.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::docker::{DockerEngine, Engine};
//!
//! # async fn run_example() -> crate::core::error::Result<()> {
//! let engine = DockerEngine::connect(None, 10, None).await?;
//! let running = engine.list_containers("alice_dev", false).await?;
//! # Ok(())
//! # }
//! ```
//!

/// Establishes the connection to the Docker daemon.
pub mod connect;
/// The collaborator trait and its records.
pub mod engine;
/// Following an attached container's output.
pub mod interaction;
/// Stopping and renaming containers.
pub mod lifecycle;
/// Port and volume mapping syntax.
pub mod mappings;
/// Build, run, tag and push.
pub mod operations;
/// Listing containers by name.
pub mod state;

#[cfg(test)]
pub mod fake;

pub use engine::{BuildSpec, ContainerHandle, ContainerRecord, DockerEngine, Engine, RunSpec};
#[cfg(test)]
pub use engine::{BuildEvent, PushEvent};
