//! # BuildRun Image Publisher
//!
//! File: cli/src/commands/publish.rs
//!
//! ## Overview
//!
//! Tags the locally built `<user>:<env>` image as `<repo>/<user>:<env>` and
//! pushes that reference. A refused tag stops the stage before any push is
//! attempted. Push progress is echoed as `status: progress` lines at `-vv`.
//!
use crate::common::docker::Engine;
use crate::common::ui::Console;
use crate::core::error::{flatten, BuildRunError, Result};
use anyhow::anyhow;
use futures_util::StreamExt;
use tracing::{info, instrument, warn};

/// Tags and pushes the image, returning the pushed reference.
///
/// # Errors
///
/// - `BuildRunError::TagFailed` if tagging is refused or fails.
/// - `BuildRunError::PushFailed` if the push stream reports an error or breaks off.
#[instrument(skip(engine, console))]
pub async fn publish<E: Engine>(
    engine: &E,
    source_tag: &str,
    repo_name: &str,
    user: &str,
    env: &str,
    console: &Console,
) -> Result<String> {
    let repo = format!("{}/{}", repo_name, user);
    let target = format!("{}:{}", repo, env);

    let tagged = match engine.tag(source_tag, &repo, env).await {
        Ok(tagged) => tagged,
        Err(e) => {
            warn!("Tagging failed: {}", flatten(&e));
            false
        }
    };
    if !tagged {
        return Err(anyhow!(BuildRunError::TagFailed { target }));
    }
    console.say(format!("Tagged image as {}", target));

    let mut events = engine.push(&repo, env);
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| push_error(&target, flatten(&e)))?;
        if let Some(err) = event.error {
            return Err(push_error(&target, err));
        }
        if let (Some(status), Some(progress)) = (&event.status, &event.progress) {
            console.detail(format!("\t{}: {}", status, progress));
        }
    }

    info!("Pushed '{}'.", target);
    console.say(format!("Pushed image: {}", target));
    Ok(target)
}

fn push_error(target: &str, reason: String) -> anyhow::Error {
    anyhow!(BuildRunError::PushFailed {
        target: target.to_string(),
        reason,
    })
}
