//! # BuildRun Engine Interface
//!
//! File: cli/src/common/docker/engine.rs
//!
//! ## Overview
//!
//! The narrow collaborator interface every stage talks to. It names exactly
//! the seven daemon operations the tool needs (`build`, `list_containers`,
//! `stop`, `rename`, `run`, `tag`, `push`) in terms of this crate's own
//! records, so the reconciliation and polling logic never sees `bollard`
//! types or error shapes.
//!
//! ## Architecture
//!
//! - **`Engine`**: the trait. Stages are generic over it.
//! - **`DockerEngine`**: the production implementation. It owns the single
//!   `bollard::Docker` connection for the lifetime of the process and
//!   delegates each call to the sibling modules (`operations`, `state`,
//!   `lifecycle`).
//! - A fake, in-memory implementation lives in `fake.rs` for unit tests.
//!
use super::{connect, lifecycle, mappings, operations, state};
use crate::core::error::Result;
use bollard::{auth::DockerCredentials, Docker};
use futures_util::stream::LocalBoxStream;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything the daemon needs to build the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub context_dir: PathBuf,
    pub tag: String,
    /// Dockerfile name relative to `context_dir`.
    pub dockerfile: String,
    pub build_args: BTreeMap<String, String>,
    pub use_cache: bool,
    pub pull: bool,
    pub remove_intermediate: bool,
}

/// One decoded entry of the build log stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEvent {
    pub stream: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// A container as reported by the daemon. Not owned by this tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    /// Names without the leading `/`.
    pub names: Vec<String>,
    /// Creation time, seconds since the epoch.
    pub created: i64,
    pub state: String,
}

impl ContainerRecord {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Everything the daemon needs to create and start the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub user: String,
    pub ports: Vec<mappings::PortMapping>,
    pub volumes: Vec<mappings::VolumeMapping>,
    pub detach: bool,
    pub network: Option<String>,
}

/// What `run` hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    /// Set when the container ran attached and has already exited.
    pub exit_code: Option<i64>,
}

/// One decoded entry of the push progress stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushEvent {
    pub status: Option<String>,
    pub progress: Option<String>,
    pub error: Option<String>,
}

/// The daemon operations the tool relies on.
///
/// Streams are consumed in order by the caller; nothing here runs
/// concurrently.
#[allow(async_fn_in_trait)]
pub trait Engine {
    /// Starts an image build and returns its log stream.
    fn build<'a>(&'a self, spec: &BuildSpec) -> LocalBoxStream<'a, Result<BuildEvent>>;

    /// Containers whose name is exactly `name`. `all` includes stopped ones.
    async fn list_containers(&self, name: &str, all: bool) -> Result<Vec<ContainerRecord>>;

    async fn stop(&self, id: &str) -> Result<()>;

    async fn rename(&self, id: &str, new_name: &str) -> Result<()>;

    /// Creates and starts a container.
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle>;

    /// Tags `source` as `repo:tag`. `Ok(false)` means the daemon refused.
    async fn tag(&self, source: &str, repo: &str, tag: &str) -> Result<bool>;

    /// Pushes `repo:tag` and returns the progress stream.
    fn push<'a>(&'a self, repo: &str, tag: &str) -> LocalBoxStream<'a, Result<PushEvent>>;
}

/// `Engine` backed by the local Docker daemon.
pub struct DockerEngine {
    docker: Docker,
    stop_timeout: i64,
    credentials: Option<DockerCredentials>,
}

impl DockerEngine {
    /// Opens (and pings) the daemon connection.
    pub async fn connect(
        socket: Option<&str>,
        stop_timeout: i64,
        credentials: Option<DockerCredentials>,
    ) -> Result<Self> {
        let docker = connect::connect_docker(socket).await?;
        Ok(Self {
            docker,
            stop_timeout,
            credentials,
        })
    }
}

impl Engine for DockerEngine {
    fn build<'a>(&'a self, spec: &BuildSpec) -> LocalBoxStream<'a, Result<BuildEvent>> {
        operations::build_image(&self.docker, spec)
    }

    async fn list_containers(&self, name: &str, all: bool) -> Result<Vec<ContainerRecord>> {
        state::list_named_containers(&self.docker, name, all).await
    }

    async fn stop(&self, id: &str) -> Result<()> {
        lifecycle::stop_container(&self.docker, id, self.stop_timeout).await
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        lifecycle::rename_container(&self.docker, id, new_name).await
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle> {
        operations::run_container(&self.docker, spec).await
    }

    async fn tag(&self, source: &str, repo: &str, tag: &str) -> Result<bool> {
        operations::tag_image(&self.docker, source, repo, tag).await
    }

    fn push<'a>(&'a self, repo: &str, tag: &str) -> LocalBoxStream<'a, Result<PushEvent>> {
        operations::push_image(&self.docker, repo, tag, self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_state_is_case_insensitive() {
        let mut record = ContainerRecord {
            id: "abc".into(),
            names: vec!["alice_dev".into()],
            created: 0,
            state: "Running".into(),
        };
        assert!(record.is_running());
        record.state = "exited".into();
        assert!(!record.is_running());
    }
}
