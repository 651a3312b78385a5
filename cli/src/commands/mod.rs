//! # BuildRun Stages
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! Parses the command line into a `Plan` and runs its stages in order:
//!
//! 1. **build** (`build.rs`): build `<user>:<env>` from the context directory.
//! 2. **run**: free the name `<user>_<env>` (`reconcile.rs`), start the new
//!    container and watch it (`launch.rs`).
//! 3. **push** (`publish.rs`): tag as `<repo>/<user>:<env>` and push.
//!
//! Each stage is switched on or off by a flag pair (`-b/-B`, `-r/-R`,
//! `-s/-S`). The first failing stage ends the invocation; later stages never
//! run. The daemon connection is opened once, and only if a stage is enabled.
//!
//! ## Value resolution
//!
//! Flags win over the configuration file (`core::config`), which wins over
//! built-in defaults:
//!
//! | value       | flag            | config                 | default            |
//! |-------------|-----------------|------------------------|--------------------|
//! | wait        | `-w/--wait`     | `defaults.wait`        | `5`                |
//! | repo        | `-o/--repo-name`| `defaults.repo_name`   | none               |
//! | network     | `--network`     | `defaults.network`     | none               |
//! | ports       | `--port`        | `defaults.ports`       | none               |
//! | volumes     | `--volume`      | `defaults.volumes`     | none               |
//! | dockerfile  | `--dockerfile`  |                        | `Dockerfile.<env>` |
//!
//! ## Examples
//!
//! ```bash
//! # Build, rotate the old container out of the way, run and watch for 5s
//! buildrun -u alice -d ./service -v
//!
//! # Only push a previously built production image
//! buildrun -u alice -d ./service -e prod -B -R -s -o acme
//! ```
//!
pub mod build;
pub mod launch;
pub mod publish;
pub mod reconcile;

use crate::common::docker::mappings::{parse_port, parse_volume};
use crate::common::docker::{BuildSpec, DockerEngine, Engine, RunSpec};
use crate::common::ui::Console;
use crate::core::config::Config;
use crate::core::error::{BuildRunError, Result};
use anyhow::anyhow;
use bollard::auth::DockerCredentials;
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Liveness window used when neither `--wait` nor the configuration set one.
pub const DEFAULT_WAIT_SECS: u64 = 5;

/// Target environment; part of the image tag and the container name.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Command-line arguments (`BuildRunArgs`)
///
/// Boolean options come in pairs (`--cache`/`--no-cache`); when both are
/// given, the last one wins.
#[derive(Parser, Debug)]
pub struct BuildRunArgs {
    /// User and project name.
    #[arg(short, long)]
    pub user: String,

    /// Docker build context directory.
    #[arg(short, long, value_parser = parse_context_dir)]
    pub dir: PathBuf,

    /// Use the image cache [default].
    #[arg(short = 'c', long, overrides_with = "no_cache")]
    pub cache: bool,
    /// Build without the image cache.
    #[arg(short = 'C', long, overrides_with = "cache")]
    pub no_cache: bool,

    /// Pull base images before the build [default].
    #[arg(short = 'p', long, overrides_with = "no_pull")]
    pub pull: bool,
    /// Do not pull base images.
    #[arg(short = 'P', long, overrides_with = "pull")]
    pub no_pull: bool,

    /// Remove intermediate build containers.
    #[arg(short = 'n', long, overrides_with = "no_rm")]
    pub rm: bool,
    /// Keep intermediate build containers [default].
    #[arg(short = 'N', long, overrides_with = "rm")]
    pub no_rm: bool,

    /// Run the container in the background [default].
    #[arg(long, overrides_with = "no_detach")]
    pub detach: bool,
    /// Run the container attached and follow its output until it exits.
    #[arg(long, overrides_with = "detach")]
    pub no_detach: bool,

    /// Target environment.
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Environment::Dev)]
    pub env: Environment,

    /// Seconds to watch the container after start; 0 or less skips the watch [default: 5].
    #[arg(short, long, allow_negative_numbers = true)]
    pub wait: Option<i64>,

    /// Tag and push the image after the other stages.
    #[arg(short = 's', long, overrides_with = "no_push")]
    pub push: bool,
    /// Do not push [default].
    #[arg(short = 'S', long, overrides_with = "push")]
    pub no_push: bool,

    /// Start a container from the image [default].
    #[arg(short = 'r', long, overrides_with = "no_run")]
    pub run: bool,
    /// Do not start a container.
    #[arg(short = 'R', long, overrides_with = "run")]
    pub no_run: bool,

    /// Build the image [default].
    #[arg(short = 'b', long, overrides_with = "no_build")]
    pub build: bool,
    /// Skip the build and use the existing image.
    #[arg(short = 'B', long, overrides_with = "build")]
    pub no_build: bool,

    /// Registry repository the image is pushed under.
    #[arg(short = 'o', long)]
    pub repo_name: Option<String>,

    /// Port to publish, `internal[/mode]:external` (e.g. `80/tcp:8080`). Repeatable.
    #[arg(long = "port", value_name = "PORT")]
    pub ports: Vec<String>,

    /// Volume to bind, `external:internal[:ro]`. Repeatable.
    #[arg(long = "volume", value_name = "VOLUME")]
    pub volumes: Vec<String>,

    /// Network to attach the container to.
    #[arg(long)]
    pub network: Option<String>,

    /// Dockerfile name inside the build context [default: Dockerfile.<env>].
    #[arg(long)]
    pub dockerfile: Option<String>,

    /// Registry user for the push.
    #[arg(long, env = "BUILDRUN_REGISTRY_USER", hide_env_values = true)]
    pub registry_user: Option<String>,

    /// Registry password or token for the push.
    #[arg(long, env = "BUILDRUN_REGISTRY_PASSWORD", hide_env_values = true)]
    pub registry_password: Option<String>,
}

/// Resolves a `--flag`/`--no-flag` pair; at most one side is set after parsing.
fn switch(on: bool, off: bool, default: bool) -> bool {
    if on {
        true
    } else if off {
        false
    } else {
        default
    }
}

impl BuildRunArgs {
    pub fn use_cache(&self) -> bool {
        switch(self.cache, self.no_cache, true)
    }
    pub fn pull_enabled(&self) -> bool {
        switch(self.pull, self.no_pull, true)
    }
    pub fn rm_enabled(&self) -> bool {
        switch(self.rm, self.no_rm, false)
    }
    pub fn detach_enabled(&self) -> bool {
        switch(self.detach, self.no_detach, true)
    }
    pub fn push_enabled(&self) -> bool {
        switch(self.push, self.no_push, false)
    }
    pub fn run_enabled(&self) -> bool {
        switch(self.run, self.no_run, true)
    }
    pub fn build_enabled(&self) -> bool {
        switch(self.build, self.no_build, true)
    }

    fn credentials(&self) -> Option<DockerCredentials> {
        if self.registry_user.is_none() && self.registry_password.is_none() {
            return None;
        }
        Some(DockerCredentials {
            username: self.registry_user.clone(),
            password: self.registry_password.clone(),
            ..Default::default()
        })
    }
}

/// `--dir` must name an existing, readable directory. `~` is expanded.
fn parse_context_dir(raw: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
    if !path.is_dir() {
        return Err(format!("'{}' is not a directory", path.display()));
    }
    std::fs::read_dir(&path)
        .map_err(|e| format!("'{}' is not readable: {}", path.display(), e))?;
    Ok(path)
}

/// Where the pushed image goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub repo_name: String,
}

/// Fully resolved work for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub user: String,
    pub env: Environment,
    pub build: Option<BuildSpec>,
    pub run: Option<RunSpec>,
    pub wait: u64,
    pub push: Option<PushTarget>,
}

impl Plan {
    /// Combines flags and configuration into the stage specs.
    ///
    /// # Errors
    ///
    /// `BuildRunError::InvalidArgument` for malformed port/volume mappings, or
    /// when pushing without a repository name.
    pub fn resolve(args: &BuildRunArgs, config: &Config) -> Result<Self> {
        let defaults = &config.defaults;
        let image_tag = format!("{}:{}", args.user, args.env);
        let name = format!("{}_{}", args.user, args.env);

        let port_specs = if args.ports.is_empty() { &defaults.ports } else { &args.ports };
        let ports = port_specs
            .iter()
            .map(String::as_str)
            .map(parse_port)
            .collect::<Result<Vec<_>>>()?;
        let volume_specs = if args.volumes.is_empty() { &defaults.volumes } else { &args.volumes };
        let volumes = volume_specs
            .iter()
            .map(String::as_str)
            .map(parse_volume)
            .collect::<Result<Vec<_>>>()?;

        let push = if args.push_enabled() {
            let repo_name = args
                .repo_name
                .clone()
                .or_else(|| defaults.repo_name.clone())
                .ok_or_else(|| {
                    anyhow!(BuildRunError::InvalidArgument(
                        "--push needs a repository: pass --repo-name or set defaults.repo_name"
                            .to_string()
                    ))
                })?;
            Some(PushTarget { repo_name })
        } else {
            None
        };

        let build = args.build_enabled().then(|| BuildSpec {
            context_dir: args.dir.clone(),
            tag: image_tag.clone(),
            dockerfile: args
                .dockerfile
                .clone()
                .unwrap_or_else(|| format!("Dockerfile.{}", args.env)),
            build_args: BTreeMap::from([("USER".to_string(), args.user.clone())]),
            use_cache: args.use_cache(),
            pull: args.pull_enabled(),
            remove_intermediate: args.rm_enabled(),
        });

        let run = args.run_enabled().then(|| RunSpec {
            image: image_tag.clone(),
            name,
            user: args.user.clone(),
            ports,
            volumes,
            detach: args.detach_enabled(),
            network: args.network.clone().or_else(|| defaults.network.clone()),
        });

        Ok(Plan {
            user: args.user.clone(),
            env: args.env,
            build,
            run,
            wait: args
                .wait
                .map(|secs| u64::try_from(secs).unwrap_or(0))
                .or(defaults.wait)
                .unwrap_or(DEFAULT_WAIT_SECS),
            push,
        })
    }

    /// The locally built image, `<user>:<env>`.
    pub fn image_tag(&self) -> String {
        format!("{}:{}", self.user, self.env)
    }

    pub fn has_work(&self) -> bool {
        self.build.is_some() || self.run.is_some() || self.push.is_some()
    }
}

/// Entry point called from `main`.
///
/// # Errors
///
/// Any stage failure, as a `BuildRunError` wrapped in `anyhow::Error`.
pub async fn handle_buildrun(args: BuildRunArgs, config: Config, console: Console) -> Result<()> {
    let plan = Plan::resolve(&args, &config)?;
    debug!("Resolved plan: {:?}", plan);
    if !plan.has_work() {
        warn!("Build, run and push are all disabled; nothing to do.");
        return Ok(());
    }

    let engine = DockerEngine::connect(
        config.daemon.socket.as_deref(),
        config.daemon.stop_timeout(),
        args.credentials(),
    )
    .await?;
    execute(&engine, &plan, launch::POLL_INTERVAL, &console).await
}

/// Runs the enabled stages of `plan` against `engine`, stopping at the first failure.
pub async fn execute<E: Engine>(
    engine: &E,
    plan: &Plan,
    poll_interval: Duration,
    console: &Console,
) -> Result<()> {
    if let Some(spec) = &plan.build {
        info!("Stage: build '{}'", spec.tag);
        build::build_image(engine, spec, console).await?;
    }

    if let Some(spec) = &plan.run {
        info!("Stage: run '{}'", spec.name);
        for moved in reconcile::free_name(engine, &spec.name, console).await? {
            info!(
                "Moved '{}' ({}, was running: {}) to '{}'",
                moved.from, moved.id, moved.was_running, moved.to
            );
        }
        launch::run_stage(engine, spec, plan.wait, poll_interval, console).await?;
    }

    if let Some(target) = &plan.push {
        info!("Stage: push to '{}'", target.repo_name);
        publish::publish(
            engine,
            &plan.image_tag(),
            &target.repo_name,
            &plan.user,
            plan.env.as_str(),
            console,
        )
        .await?;
    }
    Ok(())
}
