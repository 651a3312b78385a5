//! # BuildRun Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Foundational pieces shared by every stage of the tool:
//! - `config`: Configuration loading, merging, and validation
//! - `error`: The `BuildRunError` taxonomy and the `Result` alias
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{BuildRunError, Result}; // For error handling
//! ```
//!
pub mod config;
pub mod error;
