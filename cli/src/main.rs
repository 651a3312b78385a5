//! # BuildRun Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! This file serves as the main entry point for the `buildrun` CLI. It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Loading the configuration files
//! - Running the stages and turning any failure into one line on stderr
//!
//! ## Architecture
//!
//! - `commands`: argument definitions, plan resolution and the four stages
//! - `common`: the Docker engine interface, context archiving, console output
//! - `core`: configuration and the error taxonomy
//!
//! A failed invocation prints `BuildRunError: <code> - <message>` and exits
//! with status `1`.
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! buildrun --help
//!
//! # Build and run alice_dev, watching it for 10 seconds, with progress output
//! buildrun -u alice -d ./service -w 10 -v
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Argument parsing and the build / run / push stages.
mod common; // Docker interaction, archiving and console output.
mod core; // Configuration and errors.

use crate::common::ui::Console;
use crate::core::error::BuildRunError;

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "buildrun",
    about = "Build a Docker image, run it under a stable name, and optionally push it",
    long_about = "Builds <user>:<env> from a context directory, moves any existing <user>_<env>\n\
                  container aside (stopped and renamed after its creation time), starts a fresh\n\
                  container, checks that it stays up, and optionally tags and pushes the image.",
    version
)]
struct Cli {
    #[command(flatten)]
    args: commands::BuildRunArgs,

    /// Increase output: -v progress, -vv arguments and push progress, -vvv trace logs.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!(
        "Invoked for user '{}' (env: {}, verbosity: {})",
        cli.args.user,
        cli.args.env,
        cli.verbose
    );

    let console = Console::new(cli.verbose);
    let result = match crate::core::config::load_config() {
        Ok(config) => commands::handle_buildrun(cli.args, config, console).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::debug!("Invocation failed: {:?}", e);
        match e.downcast_ref::<BuildRunError>() {
            Some(known) => eprintln!("{}", known),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
