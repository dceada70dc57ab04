//! Command-line client for the Torque sandbox and blueprint service.
//!
//! The crate is organized around three layers:
//!
//! - [`usage`] + [`commands`] - usage-grammar parsing and action dispatch
//! - [`resources`] - typed models and per-resource HTTP managers
//! - [`output`] - table/JSON rendering of command results

pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod output;
pub mod resources;
pub mod session;
pub mod usage;
pub mod version;

/// Crate version as published; compared against the package index by the
/// update check.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
