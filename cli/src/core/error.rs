//! # BuildRun Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy of the tool. Every failure the user
//! can see is a `BuildRunError` variant carrying a stable numeric code, and is
//! printed once at the top level as a single line:
//!
//! ```text
//! BuildRunError: <code> - <message>
//! ```
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `BuildRunError`: A custom error enum using `thiserror`, one variant per failure class
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible propagation with context
//!
//! Stage code raises `BuildRunError` values wrapped in `anyhow::Error`; `main`
//! downcasts them back for printing. Daemon failures are never left as raw
//! client-library errors: each stage maps them into its own variant.
//!
//! | code | variant            |
//! |------|--------------------|
//! | 100  | `Connection`       |
//! | 101  | `BuildFailed`      |
//! | 102  | `TagFailed`        |
//! | 103  | `PushFailed`       |
//! | 104  | `ContainerDied`    |
//! | 105  | `RunFailed`        |
//! | 106  | `ReconcileFailed`  |
//! | 107  | `InvalidArgument`  |
//! | 108  | `Config`           |
//!
//! ## Examples
//!
//! ```rust
//! if !tagged {
//!     return Err(anyhow!(BuildRunError::TagFailed { target: target.clone() }));
//! }
//!
//! // At the top level
//! if let Some(e) = err.downcast_ref::<BuildRunError>() {
//!     eprintln!("{}", e);
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the buildrun application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildRunError {
    #[error("BuildRunError: {code} - Cannot connect to Docker daemon: {0}", code = self.code())]
    Connection(String),

    #[error("BuildRunError: {code} - Build Failed: {reason}", code = self.code())]
    BuildFailed { reason: String },

    #[error("BuildRunError: {code} - Failed to tag image as {target}", code = self.code())]
    TagFailed { target: String },

    #[error("BuildRunError: {code} - Failed to push {target}: {reason}", code = self.code())]
    PushFailed { target: String, reason: String },

    #[error("BuildRunError: {code} - Container {name} died with {remaining}s of the wait window left", code = self.code())]
    ContainerDied { name: String, remaining: u64 },

    #[error("BuildRunError: {code} - Failed to run container {name}: {reason}", code = self.code())]
    RunFailed { name: String, reason: String },

    #[error("BuildRunError: {code} - Failed to free container name {name}: {reason}", code = self.code())]
    ReconcileFailed { name: String, reason: String },

    #[error("BuildRunError: {code} - Invalid argument: {0}", code = self.code())]
    InvalidArgument(String),

    #[error("BuildRunError: {code} - Configuration error: {0}", code = self.code())]
    Config(String),
}

impl BuildRunError {
    /// Numeric code printed in front of the message.
    pub fn code(&self) -> u16 {
        match self {
            BuildRunError::Connection(_) => 100,
            BuildRunError::BuildFailed { .. } => 101,
            BuildRunError::TagFailed { .. } => 102,
            BuildRunError::PushFailed { .. } => 103,
            BuildRunError::ContainerDied { .. } => 104,
            BuildRunError::RunFailed { .. } => 105,
            BuildRunError::ReconcileFailed { .. } => 106,
            BuildRunError::InvalidArgument(_) => 107,
            BuildRunError::Config(_) => 108,
        }
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Renders an `anyhow` chain on one line, for embedding in a variant's reason.
pub fn flatten(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
