//! # BuildRun Docker Container State Queries
//!
//! File: cli/src/common/docker/state.rs
//!
//! ## Overview
//!
//! Read-only queries about containers. The only query the tool needs is
//! "which containers carry exactly this name", used both to find obstructions
//! before a run and to poll liveness after it.
//!
//! ## Architecture
//!
//! - **`list_named_containers`**: calls `list_containers` with an anchored
//!   `name` filter (`^name$`), then re-checks the names client side because
//!   the daemon's filter is a regular expression matched against each name.
//! - Results are converted into `ContainerRecord`s so callers never handle
//!   `bollard` models.
//!
use super::engine::ContainerRecord;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use bollard::{container::ListContainersOptions, models::ContainerSummary, Docker};
use std::collections::HashMap;
use tracing::{debug, error, instrument};

/// Lists containers whose name is exactly `name`.
///
/// # Arguments
///
/// * `all` - If `true`, includes stopped and exited containers. If `false`, only running ones.
///
/// # Errors
///
/// Returns the daemon error, with context, if the listing fails.
#[instrument(skip(docker))]
pub async fn list_named_containers(
    docker: &Docker,
    name: &str,
    all: bool,
) -> Result<Vec<ContainerRecord>> {
    let mut filters = HashMap::new();
    filters.insert("name".to_string(), vec![name_filter(name)]);
    let options = Some(ListContainersOptions {
        all,
        filters,
        ..Default::default()
    });

    let summaries = docker
        .list_containers(options)
        .await
        .map_err(|e| {
            error!("Failed to list containers named '{}': {:?}", name, e);
            anyhow!(e)
        })
        .with_context(|| format!("Failed to list containers named '{}'", name))?;

    let records: Vec<ContainerRecord> = summaries
        .into_iter()
        .map(to_record)
        .filter(|record| record.names.iter().any(|n| n == name))
        .collect();
    debug!("{} container(s) named '{}' (all: {})", records.len(), name, all);
    Ok(records)
}

/// Anchored regular expression matching only `name`.
///
/// Container names may contain `.`, which must not act as a wildcard.
fn name_filter(name: &str) -> String {
    format!("^/?{}$", name.replace('.', "\\."))
}

fn to_record(summary: ContainerSummary) -> ContainerRecord {
    ContainerRecord {
        id: summary.id.unwrap_or_default(),
        names: summary
            .names
            .unwrap_or_default()
            .into_iter()
            .map(|n| n.trim_start_matches('/').to_string())
            .collect(),
        created: summary.created.unwrap_or_default(),
        state: summary.state.map(|s| s.to_string()).unwrap_or_default(),
    }
}
