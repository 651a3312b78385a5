//! # BuildRun Docker Container Interaction
//!
//! File: cli/src/common/docker/interaction.rs
//!
//! ## Overview
//!
//! Streams the output of a container started with `--no-detach` to the host
//! terminal and reports its exit code once it stops. Detached containers never
//! go through here; their liveness is polled by the launcher instead.
//!
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use bollard::{
    container::{LogOutput, LogsOptions, WaitContainerOptions},
    Docker,
};
use futures_util::StreamExt;
use std::io::{self, Write};
use tracing::{debug, instrument, warn};

/// Copies the container's stdout/stderr to the host until it exits, then
/// returns its exit code.
///
/// # Errors
///
/// Returns the daemon error, with context, if either the log stream or the
/// wait call fails for a reason other than a non-zero exit.
#[instrument(skip(docker))]
pub async fn follow_until_exit(docker: &Docker, id: &str) -> Result<i64> {
    let options = LogsOptions {
        follow: true,
        stdout: true,
        stderr: true,
        tail: "all".to_string(),
        ..Default::default()
    };
    let mut log_stream = docker.logs(id, Some(options));
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    while let Some(chunk) = log_stream.next().await {
        match chunk {
            Ok(LogOutput::StdErr { message }) => {
                stderr
                    .write_all(&message)
                    .context("Failed to write container stderr")?;
            }
            Ok(output) => {
                stdout
                    .write_all(&output.into_bytes())
                    .context("Failed to write container stdout")?;
                stdout.flush().context("Failed to flush stdout")?;
            }
            Err(e) => {
                // The stream can end abruptly when the container exits; the wait below is authoritative.
                warn!("Log stream for container '{}' ended: {}", id, e);
                break;
            }
        }
    }

    let mut wait_stream = Box::pin(docker.wait_container(id, None::<WaitContainerOptions<String>>));
    match wait_stream.next().await {
        Some(Ok(response)) => {
            debug!("Container '{}' exited with {}", id, response.status_code);
            Ok(response.status_code)
        }
        Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => {
            debug!("Container '{}' exited with {}", id, code);
            Ok(code)
        }
        Some(Err(e)) => Err(anyhow!(e))
            .with_context(|| format!("Failed waiting for container '{}' to exit", id)),
        None => Err(anyhow!(
            "Daemon closed the wait stream for container '{}' without an exit code",
            id
        )),
    }
}
