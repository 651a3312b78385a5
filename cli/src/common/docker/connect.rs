//! # BuildRun Docker Connection Helper
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Provides `connect_docker`, the one place a `bollard::Docker` client is
//! created. The client is opened once per process, right before the first
//! stage that needs it, and passed around explicitly from then on.
//!
//! ## Architecture
//!
//! - With no socket configured, `Docker::connect_with_local_defaults()` is used
//!   (this honours `DOCKER_HOST`).
//! - With a socket path from the configuration, `Docker::connect_with_socket`.
//! - `bollard` connects lazily, so the daemon is pinged immediately and any
//!   failure is reported as `BuildRunError::Connection` before a stage starts.
//!
use crate::core::error::{BuildRunError, Result};
use anyhow::anyhow;
use bollard::{Docker, API_DEFAULT_VERSION};
use tracing::{debug, instrument};

/// Request timeout, in seconds, for a socket configured explicitly.
const SOCKET_TIMEOUT_SECS: u64 = 120;

/// Establishes and verifies a connection to the Docker daemon.
///
/// # Errors
///
/// Returns `BuildRunError::Connection` if the client cannot be created or the
/// daemon does not answer the ping.
#[instrument]
pub async fn connect_docker(socket: Option<&str>) -> Result<Docker> {
    let docker = match socket {
        Some(path) => Docker::connect_with_socket(path, SOCKET_TIMEOUT_SECS, API_DEFAULT_VERSION),
        None => Docker::connect_with_local_defaults(),
    }
    .map_err(|e| anyhow!(BuildRunError::Connection(e.to_string())))?;

    docker.ping().await.map_err(|e| {
        anyhow!(BuildRunError::Connection(format!(
            "daemon did not answer ({}). Is it running and accessible?",
            e
        )))
    })?;
    debug!("Docker daemon answered ping.");
    Ok(docker)
}
