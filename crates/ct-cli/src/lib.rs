//! Calendar target CLI library.
//!
//! This crate provides the CLI interface for importing calendar events,
//! resolving them into a target schedule and looking up the current target.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
