//! # BuildRun Image Builder
//!
//! File: cli/src/commands/build.rs
//!
//! ## Overview
//!
//! Requests the image build and reads the daemon's log stream to the end.
//! The daemon does not reliably report a failed classic build as an error
//! event, so success is decided by the log itself: the build succeeded only
//! if a `stream` entry contains `Successfully built`. A stream that simply
//! ends without that line is a failed build.
//!
use crate::common::docker::{BuildSpec, Engine};
use crate::common::ui::Console;
use crate::core::error::{flatten, BuildRunError, Result};
use anyhow::anyhow;
use futures_util::StreamExt;
use tracing::{debug, info, instrument};

/// Log line the daemon emits once the image exists.
pub const SUCCESS_MARKER: &str = "Successfully built";

/// Builds the image described by `spec`.
///
/// # Errors
///
/// `BuildRunError::BuildFailed` when the stream carries a daemon error, breaks
/// off, or ends without the success marker.
#[instrument(skip_all, fields(tag = %spec.tag))]
pub async fn build_image<E: Engine>(engine: &E, spec: &BuildSpec, console: &Console) -> Result<()> {
    if console.shows(2) {
        console.detail("Build Args:");
        console.detail(format!("\tpath: {}", spec.context_dir.display()));
        console.detail(format!("\ttag: {}", spec.tag));
        console.detail(format!("\tdockerfile: {}", spec.dockerfile));
        console.detail(format!("\tbuildargs: {:?}", spec.build_args));
        console.detail(format!("\tnocache: {}", !spec.use_cache));
        console.detail(format!("\tpull: {}", spec.pull));
        console.detail(format!("\trm: {}", spec.remove_intermediate));
    }
    console.say("\nBuild Log:");

    let mut succeeded = false;
    let mut events = engine.build(spec);
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| {
            anyhow!(BuildRunError::BuildFailed {
                reason: flatten(&e)
            })
        })?;
        if let Some(err) = event.error {
            return Err(anyhow!(BuildRunError::BuildFailed {
                reason: err.trim().to_string()
            }));
        }
        if let Some(text) = event.stream {
            if text.contains(SUCCESS_MARKER) {
                succeeded = true;
            }
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                console.say(format!("\t{}", line));
            }
        }
        if let Some(status) = event.status {
            debug!("Build status: {}", status);
        }
    }

    if !succeeded {
        return Err(anyhow!(BuildRunError::BuildFailed {
            reason: format!("no '{}' line in the build log", SUCCESS_MARKER)
        }));
    }
    info!("Image '{}' built.", spec.tag);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::docker::fake::FakeEngine;
    use crate::common::docker::BuildEvent;
    use std::collections::BTreeMap;

    fn spec() -> BuildSpec {
        BuildSpec {
            context_dir: "/tmp/ctx".into(),
            tag: "alice:dev".into(),
            dockerfile: "Dockerfile.dev".into(),
            build_args: BTreeMap::from([("USER".to_string(), "alice".to_string())]),
            use_cache: true,
            pull: true,
            remove_intermediate: false,
        }
    }

    fn code_of(result: Result<()>) -> Option<u16> {
        result
            .unwrap_err()
            .downcast_ref::<BuildRunError>()
            .map(BuildRunError::code)
    }

    #[tokio::test]
    async fn test_marker_means_success() {
        let engine = FakeEngine::new().with_build_log(&[
            "Step 1/2 : FROM alpine\n",
            " ---> 3f53bb00af94\n",
            "Successfully built 3f53bb00af94\n",
            "Successfully tagged alice:dev\n",
        ]);
        build_image(&engine, &spec(), &Console::new(0)).await.unwrap();
        assert_eq!(engine.calls(), vec!["build alice:dev"]);
    }

    #[tokio::test]
    async fn test_verbose_echoes_non_blank_lines_indented() {
        let engine = FakeEngine::new().with_build_log(&[
            "Step 1/2 : FROM alpine\n",
            "\n",
            " ---> 3f53bb00af94\n",
            "Successfully built 3f53bb00af94\n",
        ]);
        let (console, out) = Console::capture(1);
        build_image(&engine, &spec(), &console).await.unwrap();
        assert_eq!(
            out.lock().unwrap().as_str(),
            "\nBuild Log:\n\tStep 1/2 : FROM alpine\n\t---> 3f53bb00af94\n\tSuccessfully built 3f53bb00af94\n"
        );
    }

    #[tokio::test]
    async fn test_quiet_build_prints_nothing() {
        let engine = FakeEngine::new().with_build_log(&["Successfully built 3f53bb00af94\n"]);
        let (console, out) = Console::capture(0);
        build_image(&engine, &spec(), &console).await.unwrap();
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_args_shown_from_second_level() {
        let engine = FakeEngine::new().with_build_log(&["Successfully built 3f53bb00af94\n"]);
        let (console, out) = Console::capture(2);
        build_image(&engine, &spec(), &console).await.unwrap();
        let out = out.lock().unwrap();
        assert!(out.starts_with("Build Args:\n\tpath: /tmp/ctx\n\ttag: alice:dev\n"));
        assert!(out.contains("\tnocache: false\n"));
    }

    #[tokio::test]
    async fn test_clean_stream_without_marker_fails() {
        let engine = FakeEngine::new().with_build_log(&["Step 1/2 : FROM alpine\n", "Done\n"]);
        let result = build_image(&engine, &spec(), &Console::new(0)).await;
        assert_eq!(code_of(result), Some(101));
    }

    #[tokio::test]
    async fn test_empty_stream_fails() {
        let engine = FakeEngine::new();
        let result = build_image(&engine, &spec(), &Console::new(0)).await;
        assert_eq!(code_of(result), Some(101));
    }

    #[tokio::test]
    async fn test_error_event_fails_even_after_marker() {
        let engine = FakeEngine::new()
            .with_build_log(&["Successfully built 3f53bb00af94\n"])
            .with_build_event(BuildEvent {
                error: Some("failed to export image\n".into()),
                ..Default::default()
            });
        let err = build_image(&engine, &spec(), &Console::new(0))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "BuildRunError: 101 - Build Failed: failed to export image"
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_build_failure() {
        let engine = FakeEngine::new()
            .with_build_log(&["Step 1/2 : FROM alpine\n"])
            .with_build_transport_error("connection reset by peer");
        let err = build_image(&engine, &spec(), &Console::new(0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset by peer"));
        assert_eq!(
            err.downcast_ref::<BuildRunError>().map(BuildRunError::code),
            Some(101)
        );
    }
}
