//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`plan`] - Dry run: regions and tile counts
//! - [`run`] - Main command (fetch, archive, bundle, deliver)

pub mod common;
pub mod config;
pub mod plan;
pub mod run;
