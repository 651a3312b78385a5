//! # BuildRun Container Reconciler
//!
//! File: cli/src/commands/reconcile.rs
//!
//! ## Overview
//!
//! Frees the canonical container name (`<user>_<env>`) before a new container
//! claims it. Every container currently holding the name is stopped (when
//! running) and renamed to a history name derived from its creation time:
//!
//! ```text
//! alice_dev  ->  alice_dev_2024-03-01_09_15_42
//!            ->  alice_dev_2024-03-01_09_15_42_1   (if the above is taken)
//!            ->  alice_dev_2024-03-01_09_15_42_2   ...
//! ```
//!
//! Spaces and colons of the local timestamp become underscores so the result
//! stays a valid container name. Containers are stopped, never removed.
//!
use crate::common::docker::{ContainerRecord, Engine};
use crate::common::ui::Console;
use crate::core::error::{flatten, BuildRunError, Result};
use anyhow::anyhow;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use tracing::{debug, info, instrument};

/// A container moved off the canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub id: String,
    pub from: String,
    pub to: String,
    pub was_running: bool,
}

/// `<name>_<YYYY-MM-DD_HH_MM_SS>` for a creation time in any timezone.
pub fn history_stem<Tz: TimeZone>(name: &str, created: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{}_{}", name, created.format("%Y-%m-%d %H:%M:%S")).replace([' ', ':'], "_")
}

/// History stem for a creation time given in epoch seconds, rendered in local time.
pub fn rename_stem(name: &str, created: i64) -> String {
    match Local.timestamp_opt(created, 0).earliest() {
        Some(local) => history_stem(name, &local),
        // Out of chrono's range.
        None => history_stem(name, &DateTime::<Utc>::default()),
    }
}

/// Stops and renames every container named exactly `name`.
///
/// Returns the renames performed, in listing order. An empty result means the
/// name was already free.
///
/// # Errors
///
/// `BuildRunError::ReconcileFailed` if listing, stopping or renaming fails.
#[instrument(skip(engine, console))]
pub async fn free_name<E: Engine>(engine: &E, name: &str, console: &Console) -> Result<Vec<Rename>> {
    let holders = engine
        .list_containers(name, true)
        .await
        .map_err(|e| reconcile_error(name, &e))?;

    if holders.is_empty() {
        console.say(format!("No existing containers for {}.", name));
        return Ok(Vec::new());
    }
    console.say(format!("\nContainers exist for {}...", name));

    let mut renames = Vec::with_capacity(holders.len());
    for holder in holders {
        renames.push(move_aside(engine, name, &holder, console).await?);
    }
    info!("Freed container name '{}' ({} renamed).", name, renames.len());
    Ok(renames)
}

async fn move_aside<E: Engine>(
    engine: &E,
    name: &str,
    holder: &ContainerRecord,
    console: &Console,
) -> Result<Rename> {
    let was_running = holder.is_running();
    if was_running {
        console.say(format!("\tStopping running container: {}", holder.id));
        engine
            .stop(&holder.id)
            .await
            .map_err(|e| reconcile_error(name, &e))?;
    }

    let to = next_free_name(engine, &rename_stem(name, holder.created))
        .await
        .map_err(|e| reconcile_error(name, &e))?;

    console.say(format!("\tRenaming to {} (id: {})", to, holder.id));
    engine
        .rename(&holder.id, &to)
        .await
        .map_err(|e| reconcile_error(name, &e))?;

    Ok(Rename {
        id: holder.id.clone(),
        from: name.to_string(),
        to,
        was_running,
    })
}

/// First of `stem`, `stem_1`, `stem_2`, ... that no container holds.
async fn next_free_name<E: Engine>(engine: &E, stem: &str) -> Result<String> {
    let mut candidate = stem.to_string();
    let mut count = 1u32;
    while !engine.list_containers(&candidate, true).await?.is_empty() {
        debug!("Name '{}' is taken.", candidate);
        candidate = format!("{}_{}", stem, count);
        count += 1;
    }
    Ok(candidate)
}

fn reconcile_error(name: &str, err: &anyhow::Error) -> anyhow::Error {
    anyhow!(BuildRunError::ReconcileFailed {
        name: name.to_string(),
        reason: flatten(err),
    })
}
