//! # BuildRun Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! Optional TOML configuration supplying defaults that would otherwise have to
//! be repeated on every invocation (registry repository, wait window, network,
//! default port/volume mappings, daemon socket and stop timeout).
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (applied by the command handler, not here)
//! 2. Project-specific `.buildrun.toml` in the current directory or an ancestor
//!    (the search stops at the first directory containing `.git`)
//! 3. User-specific `<config dir>/buildrun/config.toml`
//! 4. Default values defined in the code
//!
//! After merging, `~` is expanded in paths and port/volume mappings are parsed
//! once so that a malformed file is reported before any daemon contact.
//!
//! ## Examples
//!
//! ```toml
//! [defaults]
//! repo_name = "registry.example.com/team"
//! wait = 10
//! volumes = ["~/data:/data"]
//!
//! [daemon]
//! stop_timeout = 5
//! ```
//!
use crate::common::docker::mappings;
use crate::core::error::{BuildRunError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)] // Error if unknown fields are in TOML
pub struct Config {
    #[serde(default)]
    pub defaults: RunDefaults,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Fallback values for flags the user did not pass.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunDefaults {
    /// Registry repository used as `<repo>/<user>:<env>` when pushing.
    pub repo_name: Option<String>,
    /// Liveness window in seconds.
    pub wait: Option<u64>,
    /// Network the container joins.
    pub network: Option<String>,
    /// Port mappings (`internal/mode:external`) used when `--port` is absent.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Volume mappings (`external:internal`) used when `--volume` is absent.
    #[serde(default)]
    pub volumes: Vec<String>,
}

/// How to reach and drive the Docker daemon.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Unix socket path (or named pipe on Windows). `None` means local defaults,
    /// which honour `DOCKER_HOST`.
    pub socket: Option<String>,
    /// Seconds the daemon waits for a graceful stop before killing.
    /// Unset until every layer has been merged; read it through `stop_timeout()`.
    pub stop_timeout: Option<i64>,
}

const DEFAULT_STOP_TIMEOUT: i64 = 10;

impl DaemonConfig {
    /// The configured stop timeout, or 10 seconds when no layer sets one.
    pub fn stop_timeout(&self) -> i64 {
        self.stop_timeout.unwrap_or(DEFAULT_STOP_TIMEOUT)
    }
}

const PROJECT_CONFIG_FILENAME: &str = ".buildrun.toml";

/// Loads, merges, expands and validates configuration for the current directory.
pub fn load_config() -> Result<Config> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let user_path = ProjectDirs::from("com", "BuildRun", "buildrun")
        .map(|dirs| dirs.config_dir().join("config.toml"));
    if user_path.is_none() {
        warn!("Could not determine user config directory.");
    }
    load_config_from(&current_dir, user_path.as_deref())
}

/// Same as `load_config` with explicit search roots.
pub fn load_config_from(start_dir: &Path, user_path: Option<&Path>) -> Result<Config> {
    let user_config = match user_path {
        Some(path) if path.is_file() => {
            info!("Loading user configuration from: {}", path.display());
            Some(load_config_from_path(path)?)
        }
        Some(path) => {
            debug!("User configuration file not found at {}", path.display());
            None
        }
        None => None,
    };
    let project_config = match find_project_config_path(start_dir) {
        Some(path) => {
            info!("Loading project configuration from: {}", path.display());
            Some(load_config_from_path(&path)?)
        }
        None => {
            debug!("No project configuration file (.buildrun.toml) found.");
            None
        }
    };
    let mut merged = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged);
    validate_config(&merged)?;
    debug!("Final loaded configuration: {:?}", merged);
    Ok(merged)
}

fn find_project_config_path(start_dir: &Path) -> Option<PathBuf> {
    let mut path = start_dir;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        anyhow!(BuildRunError::Config(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        )))
    })?;
    toml::from_str(&content).map_err(|e| {
        anyhow!(BuildRunError::Config(format!(
            "Failed to parse {}: {}",
            path.display(),
            e.message()
        )))
    })
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project = match project {
        Some(p) => p,
        None => return user,
    };
    Config {
        defaults: RunDefaults {
            repo_name: project.defaults.repo_name.or(user.defaults.repo_name),
            wait: project.defaults.wait.or(user.defaults.wait),
            network: project.defaults.network.or(user.defaults.network),
            ports: if !project.defaults.ports.is_empty() {
                project.defaults.ports
            } else {
                user.defaults.ports
            },
            volumes: if !project.defaults.volumes.is_empty() {
                project.defaults.volumes
            } else {
                user.defaults.volumes
            },
        },
        daemon: DaemonConfig {
            socket: project.daemon.socket.or(user.daemon.socket),
            stop_timeout: project.daemon.stop_timeout.or(user.daemon.stop_timeout),
        },
    }
}

fn expand_config_paths(config: &mut Config) {
    if let Some(socket) = config.daemon.socket.as_mut() {
        *socket = shellexpand::tilde(socket).into_owned();
        debug!("Expanded daemon socket path: {}", socket);
    }
}

fn validate_config(config: &Config) -> Result<()> {
    for port in &config.defaults.ports {
        mappings::parse_port(port).map_err(|e| {
            anyhow!(BuildRunError::Config(format!(
                "defaults.ports: {}",
                e.root_cause()
            )))
        })?;
    }
    for volume in &config.defaults.volumes {
        mappings::parse_volume(volume).map_err(|e| {
            anyhow!(BuildRunError::Config(format!(
                "defaults.volumes: {}",
                e.root_cause()
            )))
        })?;
    }
    if config.daemon.stop_timeout() < 0 {
        return Err(anyhow!(BuildRunError::Config(format!(
            "daemon.stop_timeout must not be negative (got {})",
            config.daemon.stop_timeout()
        ))));
    }
    if let Some(repo) = &config.defaults.repo_name {
        if repo.trim().is_empty() {
            return Err(anyhow!(BuildRunError::Config(
                "defaults.repo_name must not be empty".to_string()
            )));
        }
    }
    Ok(())
}
