//! # BuildRun Docker Lifecycle Operations
//!
//! File: cli/src/common/docker/lifecycle.rs
//!
//! ## Overview
//!
//! State-changing calls on existing containers: stopping a running container
//! and renaming a container. Both are used while freeing the canonical name
//! before a new container is started. Containers are never removed.
//!
//! ## Architecture
//!
//! - **`stop_container`**: graceful stop with a timeout. A `304 Not Modified`
//!   answer (already stopped) counts as success.
//! - **`rename_container`**: renames by id. Name conflicts (`409`) are
//!   returned as errors; callers pick a free name beforehand.
//!
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use bollard::{
    container::{RenameContainerOptions, StopContainerOptions},
    Docker,
};
use tracing::{error, info, instrument};

/// Stops a container, waiting up to `timeout_secs` before the daemon kills it.
///
/// # Errors
///
/// Returns the daemon error, with context, for anything other than "already stopped".
#[instrument(skip(docker))]
pub async fn stop_container(docker: &Docker, id: &str, timeout_secs: i64) -> Result<()> {
    info!(
        "Stopping container '{}' (Timeout: {} seconds)...",
        id, timeout_secs
    );
    let options = Some(StopContainerOptions { t: timeout_secs });
    match docker.stop_container(id, options).await {
        Ok(()) => {
            info!("Container '{}' stopped.", id);
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => {
            info!("Container '{}' was already stopped.", id);
            Ok(())
        }
        Err(e) => {
            error!("Failed to stop container '{}': {:?}", id, e);
            Err(anyhow!(e)).with_context(|| format!("Failed to stop container '{}'", id))
        }
    }
}

/// Renames a container.
///
/// # Errors
///
/// Returns the daemon error, with context, including `409` when `new_name` is taken.
#[instrument(skip(docker))]
pub async fn rename_container(docker: &Docker, id: &str, new_name: &str) -> Result<()> {
    let options = RenameContainerOptions { name: new_name };
    docker
        .rename_container(id, options)
        .await
        .map_err(|e| {
            error!("Failed to rename container '{}': {:?}", id, e);
            anyhow!(e)
        })
        .with_context(|| format!("Failed to rename container '{}' to '{}'", id, new_name))?;
    info!("Renamed container '{}' to '{}'.", id, new_name);
    Ok(())
}
