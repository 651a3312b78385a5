//! # BuildRun Container Launcher
//!
//! File: cli/src/commands/launch.rs
//!
//! ## Overview
//!
//! Starts the new container under the canonical name and, when it runs
//! detached, watches it for a short window to catch containers that exit
//! right after start (bad entrypoint, missing config, port clash inside the
//! container).
//!
//! ## Liveness window
//!
//! With a window of `wait` seconds the container is checked `wait + 1` times,
//! counting down from `wait` to `0`, one interval apart. The countdown line is
//! rewritten in place:
//!
//! ```text
//!     3: Running
//!     Success!
//! ```
//!
//! The first check that finds no running container named exactly `name` ends
//! the watch as `Liveness::Died`, carrying the countdown value at that check.
//!
use crate::common::docker::{ContainerHandle, Engine, RunSpec};
use crate::common::ui::Console;
use crate::core::error::{flatten, BuildRunError, Result};
use anyhow::anyhow;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Pause between two liveness checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of the liveness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Survived,
    /// `remaining` is the countdown value of the failed check.
    Died { remaining: u64 },
}

/// Creates and starts the container described by `spec`.
///
/// # Errors
///
/// `BuildRunError::RunFailed` if the daemon refuses to create or start it.
#[instrument(skip_all, fields(name = %spec.name))]
pub async fn launch<E: Engine>(engine: &E, spec: &RunSpec, console: &Console) -> Result<ContainerHandle> {
    if console.shows(2) {
        console.detail("\nRun Args:");
        console.detail(format!("\timage: {}", spec.image));
        console.detail(format!("\tname: {}", spec.name));
        console.detail(format!("\tuser: {}", spec.user));
        console.detail(format!("\tports: {:?}", spec.ports));
        console.detail(format!("\tvolumes: {:?}", spec.volumes));
        console.detail(format!("\tdetach: {}", spec.detach));
        console.detail(format!("\tnetwork: {:?}", spec.network));
    }

    let handle = engine.run(spec).await.map_err(|e| {
        anyhow!(BuildRunError::RunFailed {
            name: spec.name.clone(),
            reason: flatten(&e),
        })
    })?;

    info!("Container '{}' started (ID: {}).", spec.name, handle.id);
    console.say(format!("\nStarted container: {}", handle.id));
    if spec.detach {
        console.say("\nConnect with:");
        console.say(format!("\tdocker exec -it {} bash", spec.name));
        console.say("\nView logs with:");
        console.say(format!("\tdocker logs {}", spec.name));
    }
    Ok(handle)
}

/// Polls the running-container listing for `name` over a `wait`-second window.
///
/// # Errors
///
/// `BuildRunError::RunFailed` if a listing call fails.
#[instrument(skip(engine, console))]
pub async fn watch<E: Engine>(
    engine: &E,
    name: &str,
    wait: u64,
    interval: Duration,
    console: &Console,
) -> Result<Liveness> {
    console.say(format!(
        "\nWaiting {} seconds to ensure container stays up...",
        wait
    ));

    let mut remaining = wait;
    loop {
        let running = engine.list_containers(name, false).await.map_err(|e| {
            anyhow!(BuildRunError::RunFailed {
                name: name.to_string(),
                reason: flatten(&e),
            })
        })?;

        if running.is_empty() {
            console.finish_line(format!("{}: Died", remaining));
            warn!("Container '{}' stopped with {}s left in the window.", name, remaining);
            return Ok(Liveness::Died { remaining });
        }
        console.overwrite(format!("{}: Running", remaining));

        if remaining == 0 {
            break;
        }
        remaining -= 1;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    console.finish_line("Success! ");
    Ok(Liveness::Survived)
}

/// Launches the container and decides whether the run stage succeeded.
///
/// Detached containers are watched for `wait` seconds (no watch when `wait`
/// is `0`). Attached containers have already exited when `launch` returns;
/// their exit code decides.
///
/// # Errors
///
/// - `BuildRunError::ContainerDied` if the container stops inside the window.
/// - `BuildRunError::RunFailed` if it cannot be started or exits non-zero.
pub async fn run_stage<E: Engine>(
    engine: &E,
    spec: &RunSpec,
    wait: u64,
    interval: Duration,
    console: &Console,
) -> Result<()> {
    let handle = launch(engine, spec, console).await?;

    if let Some(code) = handle.exit_code {
        if code != 0 {
            return Err(anyhow!(BuildRunError::RunFailed {
                name: spec.name.clone(),
                reason: format!("container exited with status {}", code),
            }));
        }
        return Ok(());
    }

    if !spec.detach || wait == 0 {
        return Ok(());
    }
    match watch(engine, &spec.name, wait, interval, console).await? {
        Liveness::Survived => Ok(()),
        Liveness::Died { remaining } => Err(anyhow!(BuildRunError::ContainerDied {
            name: spec.name.clone(),
            remaining,
        })),
    }
}
