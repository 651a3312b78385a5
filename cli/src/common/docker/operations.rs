//! # BuildRun Core Docker Operations
//!
//! File: cli/src/common/docker/operations.rs
//!
//! ## Overview
//!
//! The pass-through calls to the Docker Engine API: building an image,
//! creating and starting a container, tagging an image and pushing it. Each
//! function takes the shared `Docker` client, translates this crate's specs
//! into `bollard` options, and translates the daemon's answers back into
//! this crate's records.
//!
//! ## Architecture
//!
//! - **`build_image`**: packs the context directory with `archive::tar`,
//!   starts the build and maps every `BuildInfo` into a `BuildEvent`. It does
//!   *not* decide whether the build succeeded; the builder stage does.
//! - **`run_container`**: maps ports, volume binds, user and network into
//!   `HostConfig` + `Config`, creates and starts the container. When not
//!   detached it follows the container output until exit (see `interaction`).
//! - **`tag_image`**: `true` on success, `false` when the daemon refuses
//!   (`404`/`409`), error otherwise.
//! - **`push_image`**: maps every `PushImageInfo` into a `PushEvent`.
//!
use super::engine::{BuildEvent, BuildSpec, ContainerHandle, PushEvent, RunSpec};
use super::interaction;
use crate::common::archive::tar::create_context_tar;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use bollard::{
    auth::DockerCredentials,
    container::{Config as ContainerConfig, CreateContainerOptions, StartContainerOptions},
    image::{BuildImageOptions, PushImageOptions, TagImageOptions},
    models::{BuildInfo, HostConfig, PortBinding, PushImageInfo},
    Docker,
};
use futures_util::stream::{self, LocalBoxStream, StreamExt};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

// --- Image Building ---

/// Starts an image build and returns the decoded log stream.
///
/// Failing to pack the build context yields a stream holding that single error.
#[instrument(skip(docker, spec), fields(tag = %spec.tag))]
pub fn build_image<'a>(
    docker: &'a Docker,
    spec: &BuildSpec,
) -> LocalBoxStream<'a, Result<BuildEvent>> {
    info!(
        "Creating build context tarball for '{}'...",
        spec.context_dir.display()
    );
    let tar_gz = match create_context_tar(&spec.context_dir, &spec.dockerfile) {
        Ok(bytes) => bytes,
        Err(e) => return stream::once(async move { Err(e) }).boxed_local(),
    };

    let options = BuildImageOptions {
        dockerfile: spec.dockerfile.clone(),
        t: spec.tag.clone(),
        buildargs: spec
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<HashMap<String, String>>(),
        nocache: !spec.use_cache,
        pull: spec.pull,
        rm: spec.remove_intermediate,
        ..Default::default()
    };
    info!("Starting image build for tag: {}", spec.tag);

    docker
        .build_image(options, None, Some(tar_gz.into()))
        .map(|item| {
            item.map(to_build_event)
                .map_err(|e| anyhow!(e).context("Failed to read build stream"))
        })
        .boxed_local()
}

fn to_build_event(info: BuildInfo) -> BuildEvent {
    let error = match (info.error, info.error_detail) {
        (Some(err), _) => Some(err),
        (None, Some(detail)) => detail.message,
        (None, None) => None,
    };
    BuildEvent {
        stream: info.stream,
        status: info.status,
        error,
    }
}

// --- Container Running ---

/// Creates and starts a container from `spec`.
///
/// # Errors
///
/// Returns the daemon error, with context, if creating, starting or (when
/// attached) following the container fails.
#[instrument(skip(docker, spec), fields(name = %spec.name, image = %spec.image))]
pub async fn run_container(docker: &Docker, spec: &RunSpec) -> Result<ContainerHandle> {
    let config = container_config(spec);

    info!("Creating container '{}' from image '{}'", spec.name, spec.image);
    let create_options = Some(CreateContainerOptions {
        name: spec.name.clone(),
        platform: None,
    });
    let created = docker
        .create_container(create_options, config)
        .await
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Failed to create container '{}'", spec.name))?;
    for warning in &created.warnings {
        warn!("Docker: {}", warning);
    }

    info!("Starting container '{}' (ID: {})", spec.name, created.id);
    docker
        .start_container(&spec.name, None::<StartContainerOptions<String>>)
        .await
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Failed to start container '{}'", spec.name))?;

    let exit_code = if spec.detach {
        None
    } else {
        Some(interaction::follow_until_exit(docker, &created.id).await?)
    };

    Ok(ContainerHandle {
        id: created.id,
        exit_code,
    })
}

/// Translates a `RunSpec` into the container creation body.
fn container_config(spec: &RunSpec) -> ContainerConfig<String> {
    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
    for port in &spec.ports {
        exposed_ports.insert(port.container_port.clone(), HashMap::new());
        port_bindings
            .entry(port.container_port.clone())
            .or_default()
            .get_or_insert_with(Vec::new)
            .push(PortBinding {
                host_ip: None,
                host_port: Some(port.host_port.clone()),
            });
    }
    let binds: Vec<String> = spec.volumes.iter().map(|v| v.to_bind()).collect();

    let host_config = HostConfig {
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        binds: (!binds.is_empty()).then_some(binds),
        network_mode: spec.network.clone(),
        ..Default::default()
    };

    let attach = !spec.detach;
    ContainerConfig {
        image: Some(spec.image.clone()),
        user: Some(spec.user.clone()),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        host_config: Some(host_config),
        attach_stdout: Some(attach),
        attach_stderr: Some(attach),
        ..Default::default()
    }
}

// --- Publishing ---

/// Tags `source` as `repo:tag`.
///
/// # Returns
///
/// * `Ok(true)` when tagged, `Ok(false)` when the daemon refused (unknown image, conflict).
#[instrument(skip(docker))]
pub async fn tag_image(docker: &Docker, source: &str, repo: &str, tag: &str) -> Result<bool> {
    let options = Some(TagImageOptions { repo, tag });
    match docker.tag_image(source, options).await {
        Ok(()) => Ok(true),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: status_code @ (404 | 409),
            message,
        }) => {
            warn!(
                "Daemon refused to tag '{}' as '{}:{}' ({}): {}",
                source, repo, tag, status_code, message
            );
            Ok(false)
        }
        Err(e) => Err(anyhow!(e))
            .with_context(|| format!("Failed to tag '{}' as '{}:{}'", source, repo, tag)),
    }
}

/// Pushes `repo:tag` and returns the decoded progress stream.
#[instrument(skip(docker, credentials))]
pub fn push_image<'a>(
    docker: &'a Docker,
    repo: &str,
    tag: &str,
    credentials: Option<DockerCredentials>,
) -> LocalBoxStream<'a, Result<PushEvent>> {
    let options = Some(PushImageOptions {
        tag: tag.to_string(),
    });
    docker
        .push_image(repo, options, credentials)
        .map(|item| {
            item.map(to_push_event)
                .map_err(|e| anyhow!(e).context("Failed to read push stream"))
        })
        .boxed_local()
}

fn to_push_event(info: PushImageInfo) -> PushEvent {
    let progress = info.progress.or_else(|| {
        info.progress_detail.and_then(|d| match (d.current, d.total) {
            (Some(current), Some(total)) => Some(format!("{}/{}", current, total)),
            (Some(current), None) => Some(current.to_string()),
            _ => None,
        })
    });
    debug!("Push event: status={:?} progress={:?}", info.status, progress);
    PushEvent {
        status: info.status,
        progress,
        error: info.error,
    }
}
